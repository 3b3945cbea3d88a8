//! 对 `slide-berry` 输入输出路径的一层封装.

use slide_berry::tile::home_output_dir;
use std::env;
use std::path::PathBuf;

/// 获取待处理切片路径.
///
/// 1. 若命令行第一个参数非空, 则返回其值;
/// 2. 否则, 若环境变量 `$WSI_SLIDE` 非空, 则返回其值;
/// 3. 否则返回 `None`.
pub fn slide_path_from_args_or_env() -> Option<PathBuf> {
    env::args()
        .nth(1)
        .or_else(|| env::var("WSI_SLIDE").ok())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// 获取切块输出根目录.
///
/// 1. 若环境变量 `$WSI_OUTPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/wsi/tiles`;
/// 3. 用户主目录未知时, 返回当前目录下的 `tiles`.
pub fn output_dir_from_env_or_home() -> PathBuf {
    match env::var("WSI_OUTPUT_DIR") {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => home_output_dir().unwrap_or_else(|| PathBuf::from("tiles")),
    }
}
