use crate::context::{self, Options};
use crate::output::{print_json, print_table};

pub fn run(opts: &Options, json: bool) -> anyhow::Result<()> {
    let config = opts.load()?;
    let configuration = context::configuration(&config, context::system_clock())?;
    let tenants = context::runtime()?.block_on(configuration.tenants())?;

    if json {
        return print_json(&tenants);
    }

    let rows: Vec<Vec<String>> = tenants
        .iter()
        .flat_map(|tenant| {
            let name = tenant.name.clone().unwrap_or_default();
            if tenant.rooms.is_empty() {
                return vec![vec![tenant.id.to_string(), name, "-".into(), "0".into()]];
            }
            tenant
                .rooms
                .iter()
                .map(|room| {
                    vec![
                        tenant.id.to_string(),
                        name.clone(),
                        room.label.clone().unwrap_or_else(|| room.id.to_string()),
                        room.inventory_items.len().to_string(),
                    ]
                })
                .collect()
        })
        .collect();
    print_table(&["TENANT", "NAME", "ROOM", "ITEMS"], &rows, "No tenants.");
    Ok(())
}
