#![forbid(unsafe_code)]

use npc_conformance::init_logging;
use npc_io::read_npy_bytes;
use npc_ndarray::{IndexCursor, flatten_index};
use std::fs;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("inspect_fixture failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = std::env::args().skip(1);
    let (Some(path), None) = (args.next(), args.next()) else {
        return Err("Usage: inspect_fixture <file.npy>".to_string());
    };

    let bytes = fs::read(&path).map_err(|err| format!("failed reading {path}: {err}"))?;
    let array = read_npy_bytes(&bytes)
        .map_err(|err| format!("{path}: {err} ({})", err.reason_code()))?;
    let header = &array.header;
    let order = header.memory_order();
    println!("dtype: {}", header.descr.dtype.name());
    println!("byte order: {}", header.descr.byte_order.name());
    println!("shape: {:?}", header.shape);
    println!("order: {}", order.name());

    let values = array
        .elements()
        .map_err(|err| format!("{path}: {err}"))?;
    for (visited, (index, value)) in IndexCursor::new(&header.shape, order)
        .zip(&values)
        .enumerate()
    {
        let offset = flatten_index(&header.shape, order, &index);
        if offset != visited {
            return Err(format!(
                "cursor visited {index:?} at step {visited} but it flattens to {offset}"
            ));
        }
        let rendered = index
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("({rendered}), {visited}: {value}");
    }
    Ok(())
}
