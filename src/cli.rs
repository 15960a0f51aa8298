use std::io::{self, Write};

use vecdocs::config::{Command, StoreArgs};
use vecdocs::{Result, VecStore};

/// Single-command mode - load db from path, execute command, save back
/// Usage: vecdocs [--db <path>] <command> [args...]
pub fn run_single_command(args: &StoreArgs, command: Command) -> Result<()> {
    let mut db = VecStore::load_or_new(&args.db, args.embedder_config())?;
    let mutates = command.is_mutation();

    let stdout = io::stdout();
    execute_command(&mut db, command, &mut stdout.lock())?;

    if mutates {
        db.save(&args.db)?;
    }
    Ok(())
}

fn execute_command(db: &mut VecStore, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Serve { .. } => {
            writeln!(out, "serve has no single-shot form")?;
        }

        Command::Create { name, dimension } => {
            db.create_collection(&name, dimension)?;
            writeln!(out, "Collection '{}' created with dimension {}.", name, dimension)?;
        }

        Command::Collections => {
            let names = db.collection_names();
            if names.is_empty() {
                writeln!(out, "No collections")?;
            }
            for name in names {
                writeln!(out, "{}", name)?;
            }
        }

        Command::Drop { name } => {
            db.drop_collection(&name)?;
            writeln!(out, "Collection '{}' dropped.", name)?;
        }

        Command::Insert { collection, doc_name, text } => {
            db.insert_document(&collection, &doc_name, &text)?;
            writeln!(out, "Document '{}' inserted into collection '{}'.", doc_name, collection)?;
        }

        Command::Update { collection, doc_name, text } => {
            db.update_document(&collection, &doc_name, &text)?;
            writeln!(out, "Document '{}' in collection '{}' updated.", doc_name, collection)?;
        }

        Command::Delete { collection, doc_name } => {
            db.delete_document(&collection, &doc_name)?;
            writeln!(out, "Document '{}' deleted from collection '{}'.", doc_name, collection)?;
        }

        Command::Search { collection, query, top_n } => {
            let hits = db.search(&collection, &query, top_n)?;
            if hits.is_empty() {
                writeln!(out, "No results found")?;
            } else {
                writeln!(out, "Top {} results:", hits.len())?;
                for (rank, hit) in hits.iter().enumerate() {
                    writeln!(out, "{}. {} (distance: {:.4}): {}",
                        rank + 1, hit.doc_name, hit.distance, hit.text)?;
                }
            }
        }

        Command::Get { doc_name } => {
            let text = db.get_document(&doc_name)?;
            writeln!(out, "{}", text)?;
        }

        Command::Docs { collection } => {
            let docs = db.list_documents(&collection)?;
            if docs.is_empty() {
                writeln!(out, "Collection '{}' is empty", collection)?;
            }
            for (name, text) in &docs {
                writeln!(out, "  {}: {}", name, text)?;
            }
        }
    }

    Ok(())
}
