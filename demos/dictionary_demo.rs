//! Walks a small dictionary through add, find, update, remove and teardown.
//!
//! Usage: `cargo run --example dictionary_demo -- [slot-count]`
//!
//! Try a constrained size like 4 to see collision chains, or 10 and up to
//! see keys spread across slots. Set `RUST_LOG=debug` for per-operation
//! records.

use chained_dict::{ChainedHashTable, Release};
use env_logger::Builder;
use log::LevelFilter;
use std::sync::Once;

static INIT: Once = Once::new();

fn initialize_logger() {
    INIT.call_once_force(|_| {
        let mut builder = Builder::new();

        builder
            .filter_level(LevelFilter::Info)
            .filter_module("chained_dict", LevelFilter::Info)
            .format_timestamp_millis()
            .parse_default_env();

        let _ = builder.try_init();
    });
}

fn announce(key: &'static str) -> Release<i32> {
    Release::new(move |v| println!("release - [ key: {key}, value: {v} ]"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    initialize_logger();

    let slots = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<usize>()?,
        None => 4,
    };
    let mut dict = ChainedHashTable::new(slots)?;

    const KEYS: [&str; 10] = [
        "key0", "key1", "key2", "key3", "key4", "key5", "key6", "key7", "key8", "key9",
    ];
    println!("> Initialize dictionary entries.");
    for (v, key) in (0..).zip(KEYS) {
        let _ = dict.add(key, v, announce(key));
    }
    println!("\n> Initial hash table state.\n{dict}");

    println!("> Find an entry.");
    println!("find(key5) = {:?}", dict.find("key5"));

    println!("\n> Find an entry that does not exist.");
    println!("find(not-a-key) = {:?}", dict.find("not-a-key"));

    println!("\n> Update an entry.");
    let _ = dict.add("key1", 11, announce("key1"));
    println!("find(key1) = {:?}", dict.find("key1"));

    println!("\n> Remove an entry.");
    println!("remove(key5) = {}", dict.remove("key5"));
    println!("find(key5) = {:?}", dict.find("key5"));

    println!("\n> Final hash table state.\n{dict}");
    dict.log_table();

    println!("> Drop the dictionary; remaining entries are released.");
    drop(dict);
    Ok(())
}
