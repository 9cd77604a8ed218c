// src/services/movement_service.rs

use crate::{
    common::error::AppError,
    db::MovementRepository,
    models::movement::{
        ChartData, ChartDataset, DailyMovement, MovementFilter, MovementTotals, StockMovement,
        UserProductivity,
    },
};

pub const EXPORT_FILE_NAME: &str = "movimentacoes.csv";

const EXPORT_HEADER: [&str; 12] = [
    "data", "tipo", "ean", "local", "endereco", "validade", "lote",
    "quantidade", "saldo_apos", "usuario", "observacao", "id",
];

/// Totais no formato do gráfico de barras do painel.
pub fn build_chart(totals: MovementTotals) -> ChartData {
    ChartData {
        labels: vec!["Entrada".to_string(), "Saída".to_string()],
        datasets: vec![ChartDataset {
            label: "Movimentações totais".to_string(),
            data: vec![totals.entries, totals.exits],
            background_color: vec!["#4CAF50".to_string(), "#F44336".to_string()],
        }],
    }
}

/// Gera o CSV de exportação (cabeçalho em português, uma linha por movimentação).
pub fn write_movements_csv(movements: &[StockMovement]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(EXPORT_HEADER)
        .map_err(|e| anyhow::anyhow!("Falha ao escrever CSV: {}", e))?;

    for m in movements {
        writer
            .write_record([
                m.created_at.to_rfc3339(),
                m.kind.label().to_string(),
                m.ean.clone(),
                m.location.label().to_string(),
                m.address.clone(),
                m.expiration_date.format("%Y-%m-%d").to_string(),
                m.batch.clone().unwrap_or_default(),
                m.quantity_changed.to_string(),
                m.balance_after.to_string(),
                m.user_email.clone().unwrap_or_default(),
                m.notes.clone().unwrap_or_default(),
                m.id.to_string(),
            ])
            .map_err(|e| anyhow::anyhow!("Falha ao escrever CSV: {}", e))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Falha ao finalizar CSV: {}", e))?;
    Ok(bytes)
}

#[derive(Clone)]
pub struct MovementService {
    movement_repo: MovementRepository,
}

impl MovementService {
    pub fn new(movement_repo: MovementRepository) -> Self {
        Self { movement_repo }
    }

    pub async fn list(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, AppError> {
        self.movement_repo.list(filter).await
    }

    pub async fn chart(&self, filter: &MovementFilter) -> Result<ChartData, AppError> {
        let totals = self.movement_repo.totals(filter).await?;
        Ok(build_chart(totals))
    }

    pub async fn daily(&self, filter: &MovementFilter) -> Result<Vec<DailyMovement>, AppError> {
        self.movement_repo.daily(filter).await
    }

    pub async fn productivity(&self, filter: &MovementFilter) -> Result<Vec<UserProductivity>, AppError> {
        self.movement_repo.productivity(filter).await
    }

    pub async fn export_csv(&self, filter: &MovementFilter) -> Result<Vec<u8>, AppError> {
        let movements = self.movement_repo.list(filter).await?;
        tracing::info!("📄 Exportando {} movimentações.", movements.len());
        write_movements_csv(&movements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{movement::MovementKind, stock::StockLocation};
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn chart_has_entry_and_exit_bars() {
        let chart = build_chart(MovementTotals { entries: 120, exits: 45 });
        assert_eq!(chart.labels, ["Entrada", "Saída"]);
        assert_eq!(chart.datasets.len(), 1);
        assert_eq!(chart.datasets[0].data, [120, 45]);
        assert_eq!(chart.datasets[0].background_color, ["#4CAF50", "#F44336"]);

        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["datasets"][0]["backgroundColor"][1], "#F44336");
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let movement = StockMovement {
            id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            ean: "7891000100103".into(),
            location: StockLocation::Store,
            kind: MovementKind::Exit,
            quantity_changed: -3,
            balance_after: 7,
            expiration_date: NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
            batch: Some("L12".into()),
            address: "GERAL".into(),
            user_id: None,
            user_email: Some("ana@loja.com".into()),
            notes: Some("venda, balcão".into()),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        };

        let bytes = write_movements_csv(&[movement]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), EXPORT_HEADER.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("2025-06-01T12:00:00+00:00,saida,7891000100103,loja,GERAL,2025-09-30,L12,-3,7,"), "{row}");
        // vírgula no texto obriga aspas
        assert!(row.contains("\"venda, balcão\""), "{row}");
        assert!(lines.next().is_none());
    }

    #[test]
    fn csv_export_of_nothing_is_just_the_header() {
        let bytes = write_movements_csv(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().trim_end(), EXPORT_HEADER.join(","));
    }
}
