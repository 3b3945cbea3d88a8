//! 对单张切片做组织检测与切块, 并生成切块分布图.
//!
//! 用法: `tiler <slide>`, 或设置 `$WSI_SLIDE`. 输出目录见 `$WSI_OUTPUT_DIR`.

mod result;
mod runner;

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
    {
        eprintln!("Failed to initialize logger: {e}");
    }

    match runner::run().and_then(|report| report.analyze().map_err(Into::into)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
