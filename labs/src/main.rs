//! Run the labs suite.
//!
//! ```sh
//! cargo run -p steadybench-labs --release -- put
//! ```

fn main() -> anyhow::Result<()> {
    steadybench::run(&steadybench_labs::suite())
}
