//! Host description, memcpy bandwidth, RNG throughput and transform
//! renormalization.
//!
//! Run with:
//!   cargo bench --bench benches
//!   cargo bench --bench benches -- memcpy       # only ids matching `memcpy`
//!   cargo bench --bench benches -- --list

use benchgate::bench_group;
use misc_benches::system::{self, HostDescription};
use misc_benches::transform;

bench_group!("memcpy", system::memcpy);
bench_group!("rand", system::rand_throughput);
bench_group!("transform_normalize", transform::transform_normalize);
bench_group!("rotate_axis_normalize", transform::rotate_axis_normalize);

fn main() {
    // stderr keeps `--format json` output on stdout parseable
    eprintln!("{}", HostDescription::collect());

    if let Err(e) = benchgate::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
