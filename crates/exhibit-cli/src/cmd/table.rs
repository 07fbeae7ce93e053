use exhibit_core::presentation::PresentationTimeline;
use uuid::Uuid;

use crate::context::{self, Options};
use crate::output::{format_secs, print_json, print_table};

pub fn run(opts: &Options, id: Uuid, json: bool) -> anyhow::Result<()> {
    let config = opts.load()?;
    let configuration = context::configuration(&config, context::system_clock())?;
    let table = context::runtime()?.block_on(configuration.table(id))?;

    if json {
        return print_json(&table);
    }

    for topic in &table.topics {
        println!("{}: {}", topic.topic, topic.description);
    }
    println!();

    let rows: Vec<Vec<String>> = table
        .presentations()
        .map(|p| {
            let length = match PresentationTimeline::new(p) {
                Ok(timeline) => format_secs(timeline.total_duration()),
                Err(e) => format!("invalid ({e})"),
            };
            let slots = p
                .presentation_items
                .iter()
                .map(|i| i.slot_number)
                .collect::<std::collections::BTreeSet<_>>()
                .len();
            vec![p.id.to_string(), p.display_name(), slots.to_string(), length]
        })
        .collect();
    print_table(
        &["PRESENTATION", "NAME", "SLOTS", "LENGTH"],
        &rows,
        "No presentations on this table.",
    );
    Ok(())
}
