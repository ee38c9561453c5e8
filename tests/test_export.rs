//! Integration test: CSV log → detection → anomaly export

use std::fs;
use std::io::Write;
use stockforest::config::DetectionConfig;
use stockforest::pipeline::StockForestPipeline;
use stockforest::utils::{
    AnomalyExporter, ExportOutcome, MovementLoader, COL_ANOMALY_LABEL, COL_ANOMALY_SCORE,
};

const HEADER: &str = "Article;Date_Mouvement;Quantite_PCU;Quantite_STU;Type_Mouvement;Type_Piece;\
Type_Statistique_0;Type_Statistique_1;Type_Statistique_2;Type_Statistique_3;Type_Statistique_4;Magasin";

fn write_log(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("mouvements.csv");
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for i in 0..48 {
        writeln!(
            file,
            "ART-{};2024-03-{:02} 0{}:15:00.000000;{},5;1;SOR;BL;S1;;;;;M{}",
            i % 3,
            1 + i / 3,
            8 + i % 2,
            10 + i % 4,
            i % 2
        )
        .unwrap();
    }
    writeln!(file, "ART-1;2024-03-30 02:00:00.000000;75000;400;ENT;INV;S9;;;;;M0").unwrap();
    writeln!(file, ";2024-03-30 03:00:00.000000;12;1;SOR;BL;S1;;;;;M0").unwrap();
    path
}

#[test]
fn test_detect_and_export_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(&dir);
    let output = dir.path().join("anomalies_detectees.csv");

    let config = DetectionConfig::default();
    let table = MovementLoader::from_config(&config).load(&input).unwrap();
    assert_eq!(table.len(), 50);
    assert_eq!(table.records[49].entity(), None);

    let report = StockForestPipeline::new(config.clone()).unwrap().run(&table.records).unwrap();
    let outcome = AnomalyExporter::from_config(&config)
        .write(&table, &report, &output)
        .unwrap();

    let rows = match outcome {
        ExportOutcome::Written { path, rows } => {
            assert_eq!(path, output);
            rows
        }
        ExportOutcome::NothingToExport => panic!("expected an export"),
    };
    assert_eq!(rows, report.selection.len());

    let written = fs::read_to_string(&output).unwrap();
    let mut lines = written.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    for column in [
        "Article",
        "Magasin",
        "Delai_entre_mouvements",
        "Variation_Quantite",
        "Moyenne_mobile_Quantite",
        "Variation_Pourcentage",
        "Heure_Mouvement",
        COL_ANOMALY_SCORE,
        COL_ANOMALY_LABEL,
    ] {
        assert!(header.contains(&column), "missing column {}", column);
    }
    assert_eq!(lines.count(), rows);
    assert!(written.contains("75000"));
}

#[test]
fn test_empty_selection_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(&dir);
    let output = dir.path().join("anomalies_detectees.csv");

    let config = DetectionConfig::default();
    let table = MovementLoader::from_config(&config).load(&input).unwrap();
    let mut report = StockForestPipeline::new(config.clone()).unwrap().run(&table.records).unwrap();
    report.selection.indices.clear();

    let outcome = AnomalyExporter::from_config(&config)
        .write(&table, &report, &output)
        .unwrap();
    assert_eq!(outcome, ExportOutcome::NothingToExport);
    assert!(!output.exists());
}

#[test]
fn test_json_config_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "n_estimators": 25, "seed": 3, "output_separator": ";" }"#).unwrap();

    let config = DetectionConfig::from_json_file(&path).unwrap();
    assert_eq!(config.n_estimators, 25);
    assert_eq!(config.seed, 3);
    assert_eq!(config.output_separator, ';');
    assert_eq!(config.contamination, 0.01);
}
