//! 从环境变量指定的文件加载配置
//!
//! 该测试会修改进程环境变量，因此单独放在一个测试二进制中。

use instancer::config::{ConfigLoader, ENV_CONFIG_PATH, ENV_CONSTRUCTOR_SELECTION};
use instancer::{Config, ConstructorSelection};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_loader_reads_path_from_environment() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[registry]\nrecord_stats = false\nconstructor_selection = \"unique\"\n\n[logging]\nlevel = \"debug\""
    )
    .unwrap();

    std::env::remove_var(ENV_CONSTRUCTOR_SELECTION);
    std::env::set_var(ENV_CONFIG_PATH, file.path());

    let config = ConfigLoader::new().load_config().unwrap();
    assert!(!config.registry.record_stats);
    assert_eq!(
        config.registry.constructor_selection,
        ConstructorSelection::Unique
    );

    let config = Config::load().unwrap();
    assert!(!config.registry.record_stats);

    // 环境变量优先于文件
    std::env::set_var(ENV_CONSTRUCTOR_SELECTION, "first");
    let config = Config::load().unwrap();
    assert_eq!(
        config.registry.constructor_selection,
        ConstructorSelection::FirstMatch
    );

    std::env::remove_var(ENV_CONFIG_PATH);
    std::env::remove_var(ENV_CONSTRUCTOR_SELECTION);
    let config = ConfigLoader::new().load_config().unwrap();
    assert!(config.registry.record_stats);
}
