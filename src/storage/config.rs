//! 配置文件管理模块

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 规范数据库路径（为空时使用平台数据目录）
    pub database_path: Option<PathBuf>,
    /// 未设置 RUST_LOG 时使用的日志过滤规则
    pub log_filter: String,
    /// 每个节点保留的运行结果条数
    pub outcome_history: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_filter: "info".to_string(),
            outcome_history: 50,
        }
    }
}

impl AppConfig {
    /// 实际使用的数据库路径
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(ConfigManager::default_database_path)
    }
}

/// 配置管理器
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "autospex", "AutoSpex")
    }

    /// 获取默认配置路径
    pub fn default_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    /// 获取默认数据库路径
    pub fn default_database_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("specs.db"))
            .unwrap_or_else(|| PathBuf::from("specs.db"))
    }

    /// 加载配置
    pub fn load(&self) -> Result<AppConfig> {
        if self.config_path.exists() {
            let content = std::fs::read_to_string(&self.config_path)?;
            serde_json::from_str(&content)
                .with_context(|| format!("配置文件格式错误: {}", self.config_path.display()))
        } else {
            Ok(AppConfig::default())
        }
    }

    /// 保存配置
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        // 确保目录存在
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// 重置为默认配置
    pub fn reset(&self) -> Result<()> {
        self.save(&AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let manager = ConfigManager::new(config_path);

        let mut config = AppConfig::default();
        config.outcome_history = 5;
        config.database_path = Some(dir.path().join("specs.db"));

        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.database_path(), dir.path().join("specs.db"));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("absent.json"));
        assert_eq!(manager.load().unwrap(), AppConfig::default());

        std::fs::write(dir.path().join("partial.json"), r#"{"log_filter": "debug"}"#).unwrap();
        let partial = ConfigManager::new(dir.path().join("partial.json")).load().unwrap();
        assert_eq!(partial.log_filter, "debug");
        assert_eq!(partial.outcome_history, 50);

        manager.save(&partial).unwrap();
        manager.reset().unwrap();
        assert_eq!(manager.load().unwrap(), AppConfig::default());
    }
}
