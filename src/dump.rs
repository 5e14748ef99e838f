use std::path::Path;
use std::time::Duration;

use tunnel_pcap::deframe::summarize;

fn print_record(index: usize, timestamp: Duration, frame: &[u8]) {
    let ts = format!("{}.{:06}", timestamp.as_secs(), timestamp.subsec_micros());
    match summarize(frame) {
        Some(summary) => println!("{index:>6} {ts} {summary}"),
        None => println!("{index:>6} {ts} unrecognized frame, {} bytes", frame.len()),
    }
}

#[cfg(not(feature = "libpcap"))]
pub fn dump(input: &Path) -> anyhow::Result<()> {
    use anyhow::Context;
    use pcap_file::pcap::PcapReader;
    use std::fs::File;
    use std::io::BufReader;

    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut reader = PcapReader::new(BufReader::new(file))?;
    println!("link type: {:?}", reader.header().datalink);

    let mut total = 0;
    while let Some(packet) = reader.next_packet() {
        let packet = packet?;
        print_record(total, packet.timestamp, &packet.data);
        total += 1;
    }

    println!("\nTotal records: {}", total);
    Ok(())
}

#[cfg(feature = "libpcap")]
pub fn dump(input: &Path) -> anyhow::Result<()> {
    use pcap::Capture;

    let mut cap = Capture::from_file(input)?;
    println!("link type: {:?}", cap.get_datalink());

    let mut total = 0;
    while let Ok(packet) = cap.next() {
        let ts = Duration::new(
            packet.header.ts.tv_sec as u64,
            packet.header.ts.tv_usec as u32 * 1000,
        );
        print_record(total, ts, packet.data);
        total += 1;
    }

    println!("\nTotal records: {}", total);
    Ok(())
}
