//! Quaternion lerp, nlerp and slerp at L1 and L2 sizes.

use misc_benches::quat;

benchgate::bench_group!("quat", quat::quat);

fn main() {
    if let Err(e) = benchgate::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
