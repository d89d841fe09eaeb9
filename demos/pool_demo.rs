//! Replays the classic 16-byte pool walkthrough through the device front
//! end, printing the leaf layout after every step and a JSON stats
//! snapshot at the end.

use anyhow::{Context, Result};
use buddypool::PoolDevice;

fn main() -> Result<()> {
    let device = PoolDevice::new(16).context("creating the pool device")?;

    let mut held = Vec::new();
    for bytes in [2, 4, 2, 2] {
        let idx = device.alloc(bytes)?;
        held.push(idx);
        println!("ADDED {bytes} BYTES\t|{}", device.render());
    }

    let target = held[1];
    device.set_cursor(target);
    let written = device.write_at_cursor(b"max\0")?;
    println!("WROTE {written} BYTES AT IDX {target}");

    device.set_transfer_size(written);
    let data = device.read_at_cursor()?;
    println!("READ BACK {:?}", String::from_utf8_lossy(&data));

    println!("{}", serde_json::to_string_pretty(&device.stats())?);

    for idx in held {
        device.free(idx)?;
        println!("FREED IDX {idx}\t|{}", device.render());
    }

    Ok(())
}
