use minder::config::MinderConfig;
use minder::store::views::{ListSelection, View};
use minder::sync::gateway::Gateway;
use minder::sync::http::HttpGateway;

#[tokio::main]
async fn main() {
    systemd_journal_logger::JournalLog::new()
        .unwrap()
        .with_syslog_identifier("minder-gateway-check".to_string())
        .install()
        .unwrap();
    log::set_max_level(log::LevelFilter::Info);

    let config = MinderConfig::load();

    println!("=== Backend vs Local Comparison ===\n");

    let backend_url = config.backend_url.trim();
    if backend_url.is_empty() {
        println!("No backend URL configured.");
        return;
    }

    println!("--- Backend: {} ---", backend_url);

    let login = match minder::sync::keyring::load_login(backend_url).await {
        Ok(Some(login)) => login,
        Ok(None) => {
            println!("  No saved login found");
            return;
        }
        Err(e) => {
            println!("  Keyring error: {}", e);
            return;
        }
    };

    let mut gateway = match HttpGateway::new(backend_url, &config.api_key) {
        Ok(g) => g,
        Err(e) => {
            println!("  Client error: {}", e);
            return;
        }
    };
    if let Err(e) = gateway.sign_in(&login.email, &login.password).await {
        println!("  Sign-in failed: {}", e);
        return;
    }
    println!("  Signed in as {}", login.email);

    let lists = match gateway.list_lists().await {
        Ok(lists) => lists,
        Err(e) => {
            println!("  Error listing lists: {}", e);
            return;
        }
    };
    let items = match gateway.list_items().await {
        Ok(items) => items,
        Err(e) => {
            println!("  Error listing items: {}", e);
            return;
        }
    };

    println!("\n  Remote: {} lists, {} items", lists.len(), items.len());
    for list in &lists {
        let count = items.iter().filter(|i| i.list_id == list.id).count();
        let shared = if list.is_shared() {
            format!(" (shared with {})", list.shared_with.join(", "))
        } else {
            String::new()
        };
        println!("    {} — {} items{}", list.name, count, shared);
    }

    let today = chrono::Local::now().date_naive();
    println!("\n  Per-view tallies:");
    for view in [View::Tasks, View::Reminders, View::Recurring, View::Trash, View::Complete] {
        let count =
            minder::store::views::filtered_items(&items, &lists, view, ListSelection::All, today)
                .len();
        println!("    {:?}: {}", view, count);
    }

    let orphans: Vec<_> = items
        .iter()
        .filter(|i| !lists.iter().any(|l| l.id == i.list_id))
        .collect();
    if !orphans.is_empty() {
        println!("\n  ORPHANED ITEMS ({}):", orphans.len());
        for item in &orphans {
            println!("    {} ({})", item.title, item.id);
        }
    }

    let list_ids: Vec<_> = lists.iter().map(|l| l.id).collect();
    match gateway.changes(None, &list_ids).await {
        Ok(batch) => {
            println!("\n  Change feed: {} pending events", batch.events.len());
            if let Some(cursor) = batch.cursor {
                println!("  Cursor: {}", cursor);
            }
        }
        Err(e) => println!("\n  Error polling change feed: {}", e),
    }

    println!("\n=== Done ===");
}
