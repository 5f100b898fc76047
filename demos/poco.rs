//! Joins two source records into one target record and prints the lineage.
//!
//! ```sh
//! cargo run --example poco -- lineage.json
//! ```
use chrono::NaiveDate;
use lineage::{
    Entity, FieldMapping, FileSinkOptions, LineageError, LineageTracker, Mapper, Orchestrator,
    Recorder, Sources, TrackableMapper,
};

struct PocoX {
    id: i32,
    name: String,
}

impl Entity for PocoX {
    const NAME: &'static str = "PocoX";
    const FIELDS: &'static [&'static str] = &["Id", "Name"];
}

struct PocoY {
    code: String,
    poco_y_date: NaiveDate,
}

impl Entity for PocoY {
    const NAME: &'static str = "PocoY";
    const FIELDS: &'static [&'static str] = &["Code", "PocoYDate"];
}

#[derive(Debug)]
struct PocoA {
    bk: String,
    named_code: String,
    date: NaiveDate,
}

impl Entity for PocoA {
    const NAME: &'static str = "PocoA";
    const FIELDS: &'static [&'static str] = &["Bk", "NamedCode", "Date"];
}

struct PocoMapper;

impl Mapper for PocoMapper {
    type Output = PocoA;

    fn map(&self, sources: &Sources) -> anyhow::Result<PocoA> {
        let x = sources.require::<PocoX>()?;
        let y = sources.require::<PocoY>()?;

        Ok(PocoA {
            bk: format!("{}_{}", x.id, y.code),
            named_code: format!("{}-{}", x.name, y.code),
            date: y.poco_y_date,
        })
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

        let rows = [
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
        ];

        recorder.record_mappings(&rows, |entry| {
            entry
                .source_system("Progress")
                .source_validated(true)
                .target_system("FCDM")
                .target_validated(true)
        })?;

        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let builder = LineageTracker::builder();
    let tracker = match std::env::args().nth(1) {
        Some(path) => builder
            .file_sink(FileSinkOptions::new(path).delete_on_startup(true))?
            .finish(),
        None => builder.finish(),
    };

    let orchestrator = Orchestrator::new(tracker);

    let sources = Sources::new()
        .with(PocoX {
            id: 1,
            name: "SampleName".into(),
        })
        .with(PocoY {
            code: "XYZ123".into(),
            poco_y_date: NaiveDate::from_ymd_opt(2024, 2, 25).unwrap_or_default(),
        });

    let mapped = orchestrator.run_tracked(&PocoMapper, &sources)?;
    let poco_a = mapped.value;

    println!("Mapped PocoA:");
    println!("Bk: {}", poco_a.bk);
    println!("NamedCode: {}", poco_a.named_code);
    println!("Date: {}", poco_a.date);

    if let Err(e) = mapped.lineage {
        eprintln!("Lineage not recorded: {e}");
    }

    println!("\nData Lineage:");
    for entry in orchestrator.tracker().all() {
        println!("{entry}");
    }

    Ok(())
}
