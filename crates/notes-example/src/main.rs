//! `nots` - a tiny note taker whose archive feature arrives via plugin.
//!
//! Demonstrates the full outset lifecycle: the Init phase opens the store and
//! provides it to plugins, the Register phase lets the archive plugin mount
//! its subcommand, execution routes through clap, and the Done phase saves
//! the store back to disk on every exit path.
//!
//! ```text
//! nots add "buy milk"
//! nots list
//! nots archive          # contributed by ArchivePlugin, not main()
//! ```
//!
//! The note file defaults to `nots.txt` in the working directory; set
//! `NOTS_FILE` to override.

mod archive;
mod store;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use clap::{Arg, Command};
use outset::Lifecycle;
use outset_plug::Registry;

use archive::ArchivePlugin;
use store::Store;

fn store_path() -> String {
    std::env::var("NOTS_FILE").unwrap_or_else(|_| "nots.txt".to_string())
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<(), anyhow::Error> {
    let registry = Rc::new(Registry::new());
    registry.install(&ArchivePlugin::new(&registry))?;

    let handlers = registry.clone();
    let teardown = registry.clone();

    let mut lifecycle = Lifecycle::builder()
        .root(Command::new("nots").about("A tiny plugin-driven note taker"))
        .plugins(registry.clone())
        .on_init(|lifecycle| {
            let store = Store::open(store_path())?;
            lifecycle.plugins().provide(RefCell::new(store));
            Ok(())
        })
        .mount(
            Command::new("add")
                .about("Add a note")
                .arg(Arg::new("text").required(true).help("The note text")),
            {
                let registry = handlers.clone();
                move |matches| {
                    let store = registry.option_required::<RefCell<Store>>()?;
                    let text = matches
                        .get_one::<String>("text")
                        .cloned()
                        .context("note text is required")?;
                    store.borrow_mut().add(text);
                    Ok(())
                }
            },
        )
        .mount(Command::new("list").about("List active notes"), {
            let registry = handlers;
            move |_matches| {
                let store = registry.option_required::<RefCell<Store>>()?;
                for note in store.borrow().active() {
                    println!("{}", note.text);
                }
                Ok(())
            }
        })
        .on_done(move || {
            if let Some(store) = teardown.option::<RefCell<Store>>() {
                store.borrow().save()?;
            }
            Ok(())
        })
        .build();

    lifecycle.execute()?;
    Ok(())
}

fn main() {
    init_logging();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
