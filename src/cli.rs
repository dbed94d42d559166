use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::services::report_writer::DEFAULT_OUTPUT_PATH;
use crate::workflow::DocumentUpload;

#[derive(Parser, Debug)]
#[command(
    name = "mrl-compare",
    version,
    about = "比对中国与欧盟的农药最大残留限量"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// 按关键词生成比对报告
    Comp(CompArgs),
    /// 上传一份中国标准文档
    Doc(DocArgs),
    /// 下载并替换 EU 数据
    Eu,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Comp(_) => "生成比对报告",
            Command::Doc(_) => "上传中国标准文档",
            Command::Eu => "更新 EU 数据",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CompArgs {
    /// 农药名或食品名关键词
    #[arg(required = true, num_args = 1..)]
    pub keywords: Vec<String>,

    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output_path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct DocArgs {
    pub document: PathBuf,
    pub version: String,
    pub begin_outline: u32,
    pub end_outline: u32,
    pub begin_tables: u32,
    pub end_tables: u32,
    pub chapter_number: u32,
}

impl From<DocArgs> for DocumentUpload {
    fn from(args: DocArgs) -> Self {
        Self {
            path: args.document,
            version: args.version,
            outline_pages: (args.begin_outline, args.end_outline),
            table_pages: (args.begin_tables, args.end_tables),
            chapter_number: args.chapter_number,
        }
    }
}
