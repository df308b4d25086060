use zprobe_core::{CsvHeightmapWriter, GridConfig, HeightmapSink, ProbeSample, ResultSet};

#[tokio::test]
async fn test_csv_writer_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = GridConfig {
        x_end: 10.0,
        y_end: 0.0,
        x_step: 5.0,
        ..GridConfig::default()
    };
    let coverage = config.coverage();
    let writer = CsvHeightmapWriter::in_directory(dir.path(), &coverage);

    let mut results = ResultSet::new();
    results.push(ProbeSample::measured(0.0, 0.0, -2.0));
    results.push(ProbeSample::measured(5.0, 0.0, -2.5));
    results.push(ProbeSample::missed(10.0, 0.0, config.missed_probe_sentinel));

    writer.persist(&results, &coverage).await.unwrap();

    assert!(writer.path().ends_with("heightmap_10x0.csv"));
    let content = std::fs::read_to_string(writer.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, vec!["X,Y,Z", "0,0,-2", "5,0,-2.5", "10,0,-999"]);
}

#[tokio::test]
async fn test_csv_writer_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let writer = CsvHeightmapWriter::new(dir.path().join("missing").join("out.csv"));
    let coverage = GridConfig::default().coverage();

    let err = writer
        .persist(&ResultSet::new(), &coverage)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("out.csv"));
}
