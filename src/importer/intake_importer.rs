// ==========================================
// 防汛救灾物资调配系统 - 物资入库导入
// ==========================================
// 职责: 批量导入国家级物资入库单（CSV），逐行落账
// 约定: 单行失败计入报告不中断整批；入库走台账
//       increase_quantity，与 API 补货共用同一条路径
// ==========================================
// CSV 列: resource_type, quantity, note
// ==========================================

use crate::domain::types::{ResourceType, Tier, NATIONAL_OWNER_ID};
use crate::importer::error::ImportError;
use crate::repository::stock_repo::StockRepository;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 导入报告
// ==========================================

/// 行级失败明细
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    /// 数据行号（表头为第 1 行，数据从第 2 行起）
    pub line: usize,
    pub message: String,
}

/// 整批导入结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub file: String,
    pub total_rows: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

// ==========================================
// IntakeImporter Trait
// ==========================================
// 用途: 入库导入主接口
// 实现者: CsvIntakeImporter
#[async_trait]
pub trait IntakeImporter: Send + Sync {
    /// 从 CSV 文件导入入库单
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> Result<ImportReport, ImportError>;

    /// 批量导入多个文件
    ///
    /// 每个文件的导入相互独立，单个文件失败不影响其他文件
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportReport, String>>;
}

// ==========================================
// CsvIntakeImporter - CSV 入库导入实现
// ==========================================
pub struct CsvIntakeImporter {
    stock_repo: Arc<StockRepository>,
}

impl CsvIntakeImporter {
    /// 创建新的 CSV 入库导入器
    pub fn new(stock_repo: Arc<StockRepository>) -> Self {
        Self { stock_repo }
    }

    /// 校验并落账单行入库记录
    fn apply_row(
        &self,
        line: usize,
        record: &csv::StringRecord,
    ) -> Result<(), RowError> {
        let raw_type = record.get(0).unwrap_or("").trim();
        let resource_type = ResourceType::parse(raw_type).ok_or_else(|| RowError {
            line,
            message: format!("未知物资类型: {}", raw_type),
        })?;

        let raw_quantity = record.get(1).unwrap_or("").trim();
        let quantity: i64 = raw_quantity.parse().map_err(|_| RowError {
            line,
            message: format!("数量无法解析为整数: {}", raw_quantity),
        })?;
        if quantity < 1 {
            return Err(RowError {
                line,
                message: format!("入库数量必须为正整数: {}", quantity),
            });
        }

        self.stock_repo
            .increase_quantity(Tier::National, NATIONAL_OWNER_ID, resource_type, quantity)
            .map_err(|e| RowError {
                line,
                message: format!("落账失败: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl IntakeImporter for CsvIntakeImporter {
    #[instrument(skip(self, file_path))]
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> Result<ImportReport, ImportError> {
        let path = file_path.as_ref();
        let file_name = path.display().to_string();

        if !path.exists() {
            return Err(ImportError::FileNotFound(file_name));
        }
        if path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase())
            != Some("csv".to_string())
        {
            return Err(ImportError::UnsupportedFormat(file_name));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ImportError::FileReadError(e.to_string()))?;

        // 表头校验: 前两列固定
        let headers = reader.headers()?.clone();
        let header_ok = headers.len() >= 2
            && headers.get(0).map(|h| h.eq_ignore_ascii_case("resource_type")) == Some(true)
            && headers.get(1).map(|h| h.eq_ignore_ascii_case("quantity")) == Some(true);
        if !header_ok {
            return Err(ImportError::MissingHeader {
                expected: "resource_type, quantity[, note]".to_string(),
            });
        }

        let mut report = ImportReport {
            file: file_name,
            total_rows: 0,
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
        };

        for (idx, result) in reader.records().enumerate() {
            let line = idx + 2; // 表头占第 1 行
            report.total_rows += 1;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    report.failed += 1;
                    report.errors.push(RowError {
                        line,
                        message: format!("行解析失败: {}", e),
                    });
                    continue;
                }
            };

            match self.apply_row(line, &record) {
                Ok(()) => report.succeeded += 1,
                Err(row_error) => {
                    report.failed += 1;
                    report.errors.push(row_error);
                }
            }
        }

        tracing::info!(
            file = %report.file,
            total = report.total_rows,
            succeeded = report.succeeded,
            failed = report.failed,
            "入库导入完成"
        );
        Ok(report)
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportReport, String>> {
        let futures = file_paths
            .iter()
            .map(|path| self.import_from_csv(path.as_ref()));

        futures::future::join_all(futures)
            .await
            .into_iter()
            .map(|result| result.map_err(|e| e.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    fn setup() -> (CsvIntakeImporter, Arc<StockRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let stock_repo = Arc::new(StockRepository::from_connection(Arc::new(Mutex::new(conn))));
        (CsvIntakeImporter::new(stock_repo.clone()), stock_repo)
    }

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_import_applies_valid_rows() {
        let (importer, stock_repo) = setup();
        let file = write_csv(
            "resource_type,quantity,note\n\
             FOOD,1500,一号仓入库\n\
             WATER,30000,\n\
             FOOD,500,二号仓入库\n",
        );

        let report = importer.import_from_csv(file.path()).await.unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);

        let food = stock_repo
            .find_by_cell(Tier::National, NATIONAL_OWNER_ID, ResourceType::Food)
            .unwrap()
            .unwrap();
        assert_eq!(food.quantity, 2000);
    }

    #[tokio::test]
    async fn test_import_bad_rows_do_not_abort_batch() {
        let (importer, stock_repo) = setup();
        let file = write_csv(
            "resource_type,quantity,note\n\
             FOOD,abc,坏行\n\
             GOLD,10,未知类型\n\
             WATER,-5,负数\n\
             MEDICAL,200,好行\n",
        );

        let report = importer.import_from_csv(file.path()).await.unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 3);
        assert_eq!(report.errors.len(), 3);
        // 行号从数据区起算
        assert_eq!(report.errors[0].line, 2);

        let medical = stock_repo
            .find_by_cell(Tier::National, NATIONAL_OWNER_ID, ResourceType::Medical)
            .unwrap()
            .unwrap();
        assert_eq!(medical.quantity, 200);
    }

    #[tokio::test]
    async fn test_import_rejects_wrong_header() {
        let (importer, _) = setup();
        let file = write_csv("foo,bar\nFOOD,100\n");

        assert!(matches!(
            importer.import_from_csv(file.path()).await,
            Err(ImportError::MissingHeader { .. })
        ));
    }

    #[tokio::test]
    async fn test_import_missing_file() {
        let (importer, _) = setup();
        assert!(matches!(
            importer.import_from_csv("/no/such/file.csv").await,
            Err(ImportError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_import_independent_files() {
        let (importer, _) = setup();
        let good = write_csv("resource_type,quantity\nFOOD,100\n");

        let results = importer
            .batch_import(vec![
                good.path().to_path_buf(),
                std::path::PathBuf::from("/no/such/file.csv"),
            ])
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
