//! SQLite 存储
//!
//! 唯一持有数据库连接的组件。中国章节只追加；EU 快照整体替换，
//! 在一个事务内先删后插，失败时保留旧快照。

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::{Chapter, ChapterHit, EuSnapshot, EuropeanRecord, Mrl};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chinese_chapters (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    pesticide  TEXT NOT NULL,
    text       TEXT NOT NULL,
    version    TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chinese_chapters_pesticide ON chinese_chapters(pesticide);

CREATE TABLE IF NOT EXISTS eu_mrls (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    pesticide_residue_name TEXT NOT NULL,
    product_name           TEXT NOT NULL,
    mrl_value_only         REAL,
    applicability_text     TEXT NOT NULL,
    application_date       TEXT,
    applicable             INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_eu_mrls_name ON eu_mrls(pesticide_residue_name);
";

/// MRL 数据库
pub struct MrlStore {
    conn: Connection,
}

impl MrlStore {
    /// 打开（必要时创建）数据库文件
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("打开数据库: {}", path.display());
        Self::with_connection(conn)
    }

    /// 内存数据库
    pub fn open_in_memory() -> AppResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// 追加一份文档的章节
    ///
    /// # 返回
    /// 写入的章节数
    pub fn insert_chinese_records(&mut self, chapters: &[Chapter]) -> AppResult<usize> {
        let created_at = chrono::Local::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut statement = tx.prepare(
                "INSERT INTO chinese_chapters(pesticide, text, version, created_at)
                 VALUES(?1, ?2, ?3, ?4)",
            )?;
            for chapter in chapters {
                statement.execute(params![
                    chapter.pesticide,
                    chapter.text,
                    chapter.version,
                    created_at
                ])?;
            }
        }
        tx.commit()?;

        info!("✓ 写入 {} 个章节", chapters.len());
        Ok(chapters.len())
    }

    /// 用新快照整体替换 EU 数据
    ///
    /// # 返回
    /// 写入的记录数
    pub fn insert_eu_records(&mut self, snapshot: &EuSnapshot) -> AppResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM eu_mrls", [])?;
        {
            let mut statement = tx.prepare(
                "INSERT INTO eu_mrls(
                    pesticide_residue_name, product_name, mrl_value_only,
                    applicability_text, application_date, applicable
                 )
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            let partitions = [(&snapshot.applicable, true), (&snapshot.not_yet_applicable, false)];
            for (records, applicable) in partitions {
                for record in records {
                    statement.execute(params![
                        record.pesticide_residue_name,
                        record.product_name,
                        record.mrl_value_only.value(),
                        record.applicability_text,
                        record.application_date,
                        applicable
                    ])?;
                }
            }
        }
        tx.commit()?;

        info!("✓ EU 数据已替换: 删除 {} 条，写入 {} 条", removed, snapshot.len());
        Ok(snapshot.len())
    }

    /// 农药名或正文包含关键词（不区分大小写）的章节
    ///
    /// 空关键词不匹配任何章节。
    pub fn query_chinese_by_keyword(&self, keyword: &str) -> AppResult<Vec<ChapterHit>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }

        let mut statement = self.conn.prepare(
            "SELECT pesticide, text, version FROM chinese_chapters
             WHERE instr(lower(pesticide), lower(?1)) > 0
                OR instr(lower(text), lower(?1)) > 0
             ORDER BY id",
        )?;
        let hits = statement
            .query_map(params![keyword], |row| {
                Ok(ChapterHit {
                    pesticide: row.get(0)?,
                    text: row.get(1)?,
                    version: row.get(2)?,
                    keyword: keyword.to_string(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!("关键词 '{}' 命中 {} 个章节", keyword, hits.len());
        Ok(hits)
    }

    /// 依次查询多个关键词，结果按关键词顺序拼接
    pub fn query_chinese_by_keywords(&self, keywords: &[String]) -> AppResult<Vec<ChapterHit>> {
        let mut hits = Vec::new();
        for keyword in keywords {
            hits.extend(self.query_chinese_by_keyword(keyword)?);
        }
        Ok(hits)
    }

    /// 当前生效数据中的全部 EU 农药名（去重、排序）
    pub fn list_all_eu_pesticide_names(&self) -> AppResult<Vec<String>> {
        let mut statement = self.conn.prepare(
            "SELECT DISTINCT pesticide_residue_name FROM eu_mrls
             WHERE applicable = 1
             ORDER BY pesticide_residue_name",
        )?;
        let names = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// 指定 EU 农药的生效记录
    ///
    /// 没有生效记录的名称不会出现在结果中。
    pub fn get_eu_records_for<'a, I>(&self, names: I) -> AppResult<BTreeMap<String, Vec<EuropeanRecord>>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut statement = self.conn.prepare(
            "SELECT pesticide_residue_name, product_name, mrl_value_only,
                    applicability_text, application_date
             FROM eu_mrls
             WHERE applicable = 1 AND pesticide_residue_name = ?1
             ORDER BY id",
        )?;

        let mut records = BTreeMap::new();
        for name in names {
            let rows = statement
                .query_map(params![name], |row| {
                    Ok(EuropeanRecord {
                        pesticide_residue_name: row.get(0)?,
                        product_name: row.get(1)?,
                        mrl_value_only: Mrl::from(row.get::<_, Option<f64>>(2)?),
                        applicability_text: row.get(3)?,
                        application_date: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            if !rows.is_empty() {
                records.insert(name.to_string(), rows);
            }
        }
        Ok(records)
    }

    /// (章节数, 生效 EU 记录数, 尚未生效 EU 记录数)
    pub fn counts(&self) -> AppResult<(usize, usize, usize)> {
        let chapters: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chinese_chapters", [], |row| row.get(0))?;
        let (applicable, not_yet): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(applicable = 1), 0), COALESCE(SUM(applicable = 0), 0) FROM eu_mrls",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((chapters as usize, applicable as usize, not_yet as usize))
    }
}
