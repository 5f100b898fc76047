//! Shared test models: two joined source records and the record derived from
//! them.
use chrono::NaiveDate;

use crate::error::LineageError;
use crate::mapper::{FieldMapping, Mapper, Recorder, TrackableMapper};
use crate::source::{Entity, Sources};

#[derive(Debug, Clone, PartialEq)]
pub struct PocoX {
    pub id: i32,
    pub name: String,
}

impl Entity for PocoX {
    const NAME: &'static str = "PocoX";
    const FIELDS: &'static [&'static str] = &["Id", "Name"];
}

#[derive(Debug, Clone, PartialEq)]
pub struct PocoY {
    pub code: String,
    pub poco_y_date: NaiveDate,
}

impl Entity for PocoY {
    const NAME: &'static str = "PocoY";
    const FIELDS: &'static [&'static str] = &["Code", "PocoYDate"];
}

#[derive(Debug, Clone, PartialEq)]
pub struct PocoA {
    pub bk: String,
    pub named_code: String,
    pub date: NaiveDate,
}

impl Entity for PocoA {
    const NAME: &'static str = "PocoA";
    const FIELDS: &'static [&'static str] = &["Bk", "NamedCode", "Date"];
}

impl PocoA {
    pub fn from_parts(x: &PocoX, y: &PocoY) -> Self {
        Self {
            bk: format!("{}_{}", x.id, y.code),
            named_code: format!("{}-{}", x.name, y.code),
            date: y.poco_y_date,
        }
    }
}

pub fn poco_x() -> PocoX {
    PocoX {
        id: 1,
        name: "X1".into(),
    }
}

pub fn poco_y() -> PocoY {
    PocoY {
        code: "Y1".into(),
        poco_y_date: NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
    }
}

/// Joins a `PocoX` with a `PocoY` into a `PocoA`.
pub struct PocoMapper {
    mappings: Vec<FieldMapping>,
}

impl PocoMapper {
    pub fn new() -> Self {
        Self {
            mappings: vec![
                FieldMapping::between::<PocoX, PocoA>("Id", "Concatenation with PocoY.Code", "Bk")
                    .describe("Identifier", "BusinessKey"),
                FieldMapping::between::<PocoX, PocoA>(
                    "Name",
                    "Concatenation with PocoY.Code",
                    "NamedCode",
                )
                .describe("The Code for PocoX", "A NameCode"),
                FieldMapping::between::<PocoY, PocoA>("PocoYDate", "Direct mapping", "Date")
                    .describe("A Date", "A Date"),
            ],
        }
    }
}

impl Default for PocoMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for PocoMapper {
    type Output = PocoA;

    fn map(&self, sources: &Sources) -> anyhow::Result<PocoA> {
        let x = sources.require::<PocoX>()?;
        let y = sources.require::<PocoY>()?;
        Ok(PocoA::from_parts(x, y))
    }
}

impl TrackableMapper for PocoMapper {
    fn lineage(
        &self,
        sources: &Sources,
        _: &PocoA,
        recorder: &mut Recorder,
    ) -> Result<(), LineageError> {
        sources.require::<PocoX>()?;
        sources.require::<PocoY>()?;

        recorder.record_mappings(&self.mappings, |entry| {
            entry
                .source_system("Progress")
                .source_validated(true)
                .target_system("FCDM")
                .target_validated(true)
        })?;

        Ok(())
    }
}
