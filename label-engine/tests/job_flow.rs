//! End-to-end job processing against in-memory printers

mod common;

use common::{CountingDiscovery, RecordingTransport, engine, kit_job, printer};
use label_engine::ExternalTemplates;
use serde_json::json;
use shared::{BatchKind, ErrorCode, OutcomeStatus, Severity};

fn statuses(summary: &shared::JobSummary, kind: BatchKind) -> Vec<OutcomeStatus> {
    summary
        .batch(kind)
        .map(|b| b.results.iter().map(|r| r.status).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_two_items_all_succeed() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job("ZD421", "ID:{{id}}", json!([{"id": "A"}, {"id": "B"}]));
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.failure_count, 0);
    assert!(summary.orchestration_errors.is_empty());
    assert_eq!(transport.sent(), vec!["ID:A", "ID:B"]);

    let batch = summary.batch(BatchKind::Kit).unwrap();
    assert_eq!(batch.target.as_deref(), Some("ZD421"));
    assert_eq!(batch.results[1].device.as_ref().unwrap().uid, "1");
    assert!(summary.is_clean());
}

#[tokio::test]
async fn test_item_without_id_is_skipped() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job("ZD421", "ID:{{id}}", json!([{"id": "A"}, {}]));
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    assert_eq!(
        statuses(&summary, BatchKind::Kit),
        vec![OutcomeStatus::Success, OutcomeStatus::Skipped]
    );
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.failure_count, 1);
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test]
async fn test_kit_fields_render_from_statics() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job(
        "ZD421",
        "^XA^FD{{KitId}}|{{KitType}}|{{LotNumber}}|{{ExpirationDate}}^FS^XZ",
        json!([{"KitID": "K1"}]),
    );
    engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    assert_eq!(transport.sent(), vec!["^XA^FDK1|KIT|L2301|2027-01-31^FS^XZ"]);
}

#[tokio::test]
async fn test_compile_failure_never_dispatches() {
    let transport = RecordingTransport::new();
    let (engine, notifier) =
        engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job("ZD421", "ID:{{id", json!([{"id": "A"}, {"id": "B"}, {}]));
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    let batch = summary.batch(BatchKind::Kit).unwrap();
    assert_eq!(batch.results.len(), 3);
    assert!(batch.results.iter().all(|r| r.status == OutcomeStatus::CompileError));
    assert!(batch.structural_error.is_some());
    assert_eq!(transport.attempts(), 0);
    assert_eq!(summary.failure_count, 3);
    assert!(
        notifier
            .messages(Severity::Error)
            .iter()
            .any(|m| m.contains("Template compilation error"))
    );
}

#[tokio::test]
async fn test_missing_items_is_structural() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job("ZD421", "ID:{{id}}", json!([]));
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    let batch = summary.batch(BatchKind::Kit).unwrap();
    assert!(batch.results.is_empty());
    assert!(
        batch
            .structural_error
            .as_deref()
            .unwrap()
            .contains("item collection is empty")
    );
    assert_eq!(summary.total, 0);
}

#[tokio::test]
async fn test_render_error_isolated_to_item() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job(
        "ZD421",
        "ID:{{id}} {{Extra}}",
        json!([{"id": "A"}, {"id": "B", "Extra": {"nested": true}}, {"id": "C"}]),
    );
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    assert_eq!(
        statuses(&summary, BatchKind::Kit),
        vec![
            OutcomeStatus::Success,
            OutcomeStatus::RenderError,
            OutcomeStatus::Success
        ]
    );
    let failed = &summary.batch(BatchKind::Kit).unwrap().results[1];
    assert_eq!(failed.context.index, 1);
    assert_eq!(failed.context.item_id.as_deref(), Some("B"));
    assert!(failed.device.is_none());
    assert_eq!(transport.sent(), vec!["ID:A ", "ID:C "]);
}

#[tokio::test]
async fn test_send_failure_keeps_going() {
    let transport = RecordingTransport::failing_on(&[1]);
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job("ZD421", "ID:{{id}}", json!([{"id": "A"}, {"id": "B"}, {"id": "C"}]));
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    assert_eq!(
        statuses(&summary, BatchKind::Kit),
        vec![
            OutcomeStatus::Success,
            OutcomeStatus::SendError,
            OutcomeStatus::Success
        ]
    );
    let failed = &summary.batch(BatchKind::Kit).unwrap().results[1];
    assert_eq!(failed.error_detail.as_ref().unwrap()["error"], "paper out");
    assert_eq!(failed.device.as_ref().unwrap().name, "ZD421");
    assert!(summary.message.contains("Send Failures: 1"));
}

#[tokio::test]
async fn test_unknown_printer_fails_remaining_items() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job("GK420", "ID:{{id}}", json!([{}, {"id": "A"}, {"id": "B"}]));
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    assert_eq!(
        statuses(&summary, BatchKind::Kit),
        vec![
            OutcomeStatus::Skipped,
            OutcomeStatus::SendError,
            OutcomeStatus::SendError
        ]
    );
    let results = &summary.batch(BatchKind::Kit).unwrap().results;
    assert!(results[2].message.contains("printer not found: GK420"));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_target_resolves_case_insensitively() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job("zd421", "ID:{{id}}", json!([{"id": "A"}]));
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();
    assert_eq!(summary.success_count, 1);
}

#[tokio::test]
async fn test_placeholder_uses_external_template() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job("ZD421", "EXTERNAL_TEMPLATE", json!([{"KitID": "K1"}]));
    let mut externals = ExternalTemplates::new();
    externals.insert(BatchKind::Kit, "EXT:{{KitId}}".to_string());

    let summary = engine.run_json(&job, &externals).await.unwrap();
    assert_eq!(summary.success_count, 1);
    assert!(summary.orchestration_errors.is_empty());
    assert_eq!(transport.sent(), vec!["EXT:K1"]);
}

#[tokio::test]
async fn test_placeholder_without_body_is_orchestration_error() {
    let transport = RecordingTransport::new();
    let (engine, notifier) =
        engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = kit_job("ZD421", "EXTERNAL_TEMPLATE", json!([{"KitID": "K1"}, {"KitID": "K2"}]));

    for externals in [ExternalTemplates::new(), {
        let mut blank = ExternalTemplates::new();
        blank.insert(BatchKind::Kit, "   ".to_string());
        blank
    }] {
        notifier.clear();
        let summary = engine.run_json(&job, &externals).await.unwrap();

        assert_eq!(summary.orchestration_errors.len(), 1);
        let batch = summary.batch(BatchKind::Kit).unwrap();
        assert!(batch.structural_error.is_some());
        assert!(batch.results.iter().all(|r| r.status == OutcomeStatus::CompileError));
        assert_eq!(summary.failure_count, 2);
        assert!(
            notifier
                .messages(Severity::Error)
                .iter()
                .any(|m| m.starts_with("Orchestration errors:"))
        );
    }
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_batches_run_independently() {
    let kit = RecordingTransport::new();
    let specimen = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![
        printer("Kit Printer", "1", kit.clone()),
        printer("Specimen Printer", "2", specimen.clone()),
    ]));

    let job = json!({
        "KitLabelsRequest": {
            "KitSKU": "KIT-100-A",
            "LabelSet": {
                "KitLabelData": {
                    "PrinterName": "Kit Printer",
                    "LabelTemplateZPL": "{{KitId}}",
                    "KitLabelIDs": [{"KitID": "K1"}, {}]
                },
                "SpecimenLabelData": {
                    "PrinterName": "2",
                    "LabelTemplateZPL": "{{SpecimenId}}/{{LabelType}}/{{LotNumber}}",
                    "SpecimenLabelIDs": [{"SpecimenID": "S1", "LabelType": "Serum"}, {"SpecimenID": "S2"}]
                }
            }
        }
    });
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    assert_eq!(summary.batches.len(), 2);
    assert_eq!(summary.batches[0].kind, BatchKind::Kit);
    assert_eq!(kit.sent(), vec!["K1"]);
    assert_eq!(
        specimen.sent(),
        vec!["S1/Serum/LOT_MISSING", "S2/TYPE_MISSING/LOT_MISSING"]
    );
    assert_eq!(summary.total, 4);
    assert_eq!(summary.success_count + summary.failure_count, summary.total);
}

#[tokio::test]
async fn test_counts_always_add_up() {
    let transport = RecordingTransport::failing_on(&[0]);
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport)]));

    let job = json!({
        "KitLabelsRequest": {
            "LabelSet": {
                "KitLabelData": {
                    "PrinterName": "ZD421",
                    "LabelTemplateZPL": "{{KitId}}{{Obj}}",
                    "KitLabelIDs": [{"KitID": "K1"}, {"KitID": "K2", "Obj": [1]}, {}, {"KitID": "K4"}]
                },
                "SpecimenLabelData": {
                    "LabelTemplateZPL": "{{",
                    "SpecimenLabelIDs": [{"SpecimenID": "S1"}]
                }
            }
        }
    });
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    let records: usize = summary.batches.iter().map(|b| b.results.len()).sum();
    assert_eq!(summary.total, records);
    assert_eq!(summary.success_count + summary.failure_count, summary.total);
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.total, 5);
}

#[tokio::test]
async fn test_notifications_mirror_records() {
    let transport = RecordingTransport::failing_on(&[1]);
    let (engine, notifier) =
        engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport)]));

    let job = kit_job("ZD421", "ID:{{id}}", json!([{"id": "A"}, {"id": "B"}, {}]));
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    let notices = notifier.notices();
    for record in &summary.batch(BatchKind::Kit).unwrap().results {
        let matching: Vec<_> = notices.iter().filter(|n| n.message == record.message).collect();
        assert_eq!(matching.len(), 1, "one notice per record: {}", record.message);
        assert_eq!(matching[0].severity, record.status.severity());
    }

    let last = notices.last().unwrap();
    assert_eq!(last.message, summary.message);
    assert_eq!(last.severity, Severity::Error);
}

#[tokio::test]
async fn test_missing_payload_is_fatal() {
    let (engine, _) = engine(CountingDiscovery::new(vec![]));

    let err = engine.run(None, &ExternalTemplates::new()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPayload);

    let err = engine
        .run_json(&json!({"Other": {}}), &ExternalTemplates::new())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPayload);
}

#[tokio::test]
async fn test_empty_label_set_gives_empty_summary() {
    let discovery = CountingDiscovery::new(vec![]);
    let (engine, notifier) = engine(discovery.clone());

    let summary = engine
        .run_json(&json!({"KitLabelsRequest": {"KitSKU": "X"}}), &ExternalTemplates::new())
        .await
        .unwrap();
    assert!(summary.batches.is_empty());
    assert_eq!(summary.total, 0);
    assert_eq!(discovery.scans(), 0);
    assert_eq!(notifier.messages(Severity::Warning).len(), 2);
}

#[tokio::test]
async fn test_malformed_batch_does_not_stop_sibling() {
    let transport = RecordingTransport::new();
    let (engine, notifier) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let job = json!({
        "KitLabelsRequest": {
            "LabelSet": {
                "KitLabelData": {
                    "PrinterName": "ZD421",
                    "LabelTemplateZPL": "{{KitId}}",
                    "KitLabelIDs": "K1"
                },
                "SpecimenLabelData": {
                    "PrinterName": "ZD421",
                    "LabelTemplateZPL": "S:{{SpecimenId}}",
                    "SpecimenLabelIDs": [{"SpecimenID": "S1"}]
                }
            }
        }
    });
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    let kit = summary.batch(BatchKind::Kit).unwrap();
    let reason = kit.structural_error.as_deref().unwrap();
    assert!(reason.contains("KitLabelIDs"));
    assert!(reason.contains("expected a sequence"));
    assert!(kit.results.is_empty());

    assert_eq!(statuses(&summary, BatchKind::Specimen), vec![OutcomeStatus::Success]);
    assert_eq!(transport.sent(), vec!["S:S1"]);
    assert!(notifier.messages(Severity::Error).iter().any(|m| m.contains("KitLabelIDs")));
}

#[tokio::test]
async fn test_wrong_typed_printer_keeps_item_records() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let mut job = kit_job("ZD421", "{{KitId}}", json!([{"KitID": "K1"}, {"KitID": "K2"}]));
    job["KitLabelsRequest"]["LabelSet"]["KitLabelData"]["PrinterName"] = json!(7);
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    assert_eq!(
        statuses(&summary, BatchKind::Kit),
        vec![OutcomeStatus::CompileError, OutcomeStatus::CompileError]
    );
    assert!(
        summary.batch(BatchKind::Kit).unwrap().structural_error.as_deref().unwrap().contains("PrinterName")
    );
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_wrong_typed_static_field_rejects_batches() {
    let transport = RecordingTransport::new();
    let (engine, _) = engine(CountingDiscovery::new(vec![printer("ZD421", "1", transport.clone())]));

    let mut job = kit_job("ZD421", "{{KitId}}", json!([{"KitID": "K1"}]));
    job["KitLabelsRequest"]["KitSKU"] = json!(123);
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    let kit = summary.batch(BatchKind::Kit).unwrap();
    assert!(kit.structural_error.as_deref().unwrap().contains("KitSKU"));
    assert_eq!(statuses(&summary, BatchKind::Kit), vec![OutcomeStatus::CompileError]);
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_unreadable_label_set_is_orchestration_error() {
    let (engine, _) = engine(CountingDiscovery::new(vec![]));

    let job = json!({ "KitLabelsRequest": { "LabelSet": "nope" } });
    let summary = engine.run_json(&job, &ExternalTemplates::new()).await.unwrap();

    assert_eq!(summary.total, 0);
    assert_eq!(summary.orchestration_errors.len(), 1);
    assert!(summary.orchestration_errors[0].contains("LabelSet"));
}
