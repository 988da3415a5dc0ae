//! AutoSpex - 工业自动化项目文件的规则验证工具
//!
//! 命令行入口：运行规范、升级旧规范、在数据库中保存和检查规范。

use anyhow::{Context, Result};
use autospex::core::document::JsonDocument;
use autospex::core::migration::SpecSerializer;
use autospex::core::models::{Outcome, ResultState};
use autospex::core::rule_engine::{CancelFlag, RuleEngine};
use autospex::core::service;
use autospex::storage::config::{AppConfig, ConfigManager};
use autospex::storage::database::Database;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "autospex")]
#[command(about = "对自动化项目文档运行验证规范", long_about = None)]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 对文档运行一个或多个规范文件
    Run {
        /// 规范文件
        #[arg(long, required = true, num_args = 1..)]
        spec: Vec<PathBuf>,

        /// 文档文件（JSON）
        #[arg(long)]
        document: PathBuf,

        /// 以 JSON 输出结果
        #[arg(long)]
        json: bool,
    },
    /// 把规范文件升级到当前架构版本
    Migrate {
        #[arg(long)]
        spec: PathBuf,

        /// 输出路径，缺省打印到标准输出
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,
    },
    /// 以节点 ID 保存规范文件
    Save {
        #[arg(long)]
        node: String,

        #[arg(long)]
        spec: PathBuf,

        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// 运行已保存的规范并记录结果
    Check {
        #[arg(long)]
        node: String,

        #[arg(long)]
        document: PathBuf,

        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// 列出已保存的规范
    List {
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn read_spec(serializer: &SpecSerializer, path: &Path) -> Result<autospex::core::spec::Spec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("读取规范失败: {}", path.display()))?;
    serializer
        .deserialize(&raw)
        .with_context(|| format!("规范格式错误: {}", path.display()))
}

fn open_database(config: &AppConfig, db: Option<PathBuf>) -> Result<Database> {
    let path = db.unwrap_or_else(|| config.database_path());
    Database::open(&path)
}

fn print_outcome(outcome: &Outcome) {
    println!(
        "{}: {} (找到 {}，候选 {}，在范围内: {})",
        outcome.name, outcome.result, outcome.found, outcome.candidates, outcome.in_range
    );
    for evaluation in outcome
        .evaluations()
        .filter(|e| e.result >= ResultState::Failed)
    {
        println!(
            "  [{}] {} {}: 期望 {}，实际 {}{}",
            evaluation.result,
            evaluation.candidate,
            evaluation.criteria,
            evaluation.expected,
            evaluation.actual,
            evaluation
                .error
                .as_deref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(ConfigManager::default_path);
    let config = ConfigManager::new(config_path).load()?;

    // 初始化日志（输出到 stderr，stdout 留给结果）
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)))
        .init();

    let serializer = SpecSerializer::default();

    match cli.cmd {
        Commands::Run {
            spec,
            document,
            json,
        } => {
            let specs = spec
                .iter()
                .map(|path| read_spec(&serializer, path))
                .collect::<Result<Vec<_>>>()?;
            let document = Arc::new(JsonDocument::load(&document)?);

            let cancel = CancelFlag::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("收到中断信号，未开始的规范将被取消");
                    ctrl_c.cancel();
                }
            });

            let outcomes = service::run_specs(specs, document, cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                outcomes.iter().for_each(print_outcome);
            }
        }
        Commands::Migrate { spec, out } => {
            let migrated = serializer.serialize_pretty(&read_spec(&serializer, &spec)?)?;
            match out {
                Some(out) => {
                    std::fs::write(&out, migrated)?;
                    println!("已写入 {}", out.display());
                }
                None => println!("{}", migrated),
            }
        }
        Commands::Save { node, spec, db } => {
            let spec = read_spec(&serializer, &spec)?;
            open_database(&config, db)?.save_spec(&node, &spec)?;
        }
        Commands::Check { node, document, db } => {
            let database = open_database(&config, db)?;
            let spec = database
                .load_spec(&node)?
                .with_context(|| format!("节点 {} 没有保存的规范", node))?;
            let document = JsonDocument::load(&document)?;

            let outcome = RuleEngine::new().run(&spec, &document)?;
            database.save_outcome(&node, &outcome)?;
            database.cleanup_old_outcomes(config.outcome_history)?;
            print_outcome(&outcome);
        }
        Commands::List { db } => {
            for record in open_database(&config, db)?.list_specs()? {
                println!(
                    "{}\t{}\tv{}\t{}",
                    record.node_id,
                    record.name,
                    record.schema_version,
                    record.updated_at.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}
