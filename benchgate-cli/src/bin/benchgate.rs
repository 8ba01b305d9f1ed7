fn main() {
    benchgate_cli::run_pipeline()
}
