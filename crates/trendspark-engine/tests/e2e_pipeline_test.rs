//! E2E tests for the validation pipeline
//!
//! External services are replaced with scripted doubles; everything between
//! them (prompting, extraction, coercion, fallbacks, assembly) is real.

use std::sync::Arc;

use trendspark_engine::mock::{ScriptedGenerator, StaticSearchBackend};
use trendspark_engine::search::SearchItem;
use trendspark_engine::{
    CompetitorSearch, EngineError, FallbackReason, GenerativeAnalyst, IdeaInput, Stage,
    ValidationPipeline,
};

fn test_idea() -> IdeaInput {
    serde_json::from_str(
        r#"{"title": "Test", "description": "A widget that does X", "industry": null, "target_audience": null}"#,
    )
    .unwrap()
}

#[tokio::test]
async fn e2e_well_formed_services_produce_full_report() {
    let generator = Arc::new(ScriptedGenerator::new(
        "gemini-test",
        [
            r#"{"strengths":["a"],"weaknesses":["b"],"opportunities":["c"],"threats":["d"]}"#,
            "```json\n{\"audience_profile\":\"profile\", \"potential_keywords\":[\"k1\",\"k2\"]}\n```",
            r#"{"executive_summary":"sum","overall_score":7.5,"recommended_next_steps":["s1","s2","s3"]}"#,
        ],
    ));
    let backend = Arc::new(StaticSearchBackend::with_items(vec![
        SearchItem::new("Widgetly", "https://widgetly.example", "Widgets that do X"),
        SearchItem::new("XMaker", "https://xmaker.example", "We make X easy"),
    ]));
    let pipeline = ValidationPipeline::new(
        GenerativeAnalyst::new(generator.clone()),
        CompetitorSearch::new(backend.clone()),
    );

    let run = pipeline.run_traced(&test_idea()).await;
    let report = &run.report;

    assert_eq!(report.idea_name, "Test");
    assert_eq!(report.overall_score, 7.5);
    assert_eq!(report.executive_summary, "sum");
    assert_eq!(report.competitor_analysis.len(), 2);
    assert_eq!(report.recommended_next_steps.len(), 3);
    assert_eq!(report.swot_analysis.strengths, vec!["a"]);
    assert_eq!(report.swot_analysis.threats, vec!["d"]);
    assert_eq!(report.market_analysis.audience_profile, "profile");
    assert_eq!(report.market_analysis.potential_keywords, vec!["k1", "k2"]);
    assert!(uuid::Uuid::parse_str(&report.report_id).is_ok());

    assert!(!run.is_degraded());
    assert_eq!(generator.calls(), 3);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn e2e_generative_outage_still_returns_complete_report() {
    let generator = Arc::new(ScriptedGenerator::failing(
        "gemini-test",
        EngineError::Provider {
            status: 503,
            message: "UNAVAILABLE: The model is overloaded".to_string(),
        },
    ));
    let backend = Arc::new(StaticSearchBackend::with_items(vec![SearchItem::new(
        "unused", "unused", "unused",
    )]));
    let pipeline = ValidationPipeline::new(
        GenerativeAnalyst::new(generator),
        CompetitorSearch::new(backend.clone()),
    );

    let run = pipeline.run_traced(&test_idea()).await;
    let report = &run.report;

    assert_eq!(report.idea_name, "Test");
    assert_eq!(report.overall_score, 1.0);
    assert_eq!(report.executive_summary, "Error generating final summary.");
    assert_eq!(report.recommended_next_steps.len(), 3);
    assert!(report.swot_analysis.strengths[0].starts_with("Error generating SWOT analysis"));
    assert!(report
        .market_analysis
        .audience_profile
        .starts_with("Error generating market analysis"));
    assert!(report.market_analysis.potential_keywords.is_empty());
    assert!(report.competitor_analysis.is_empty());

    // no keywords means the search is never issued
    assert_eq!(backend.calls(), 0);
    assert_eq!(
        run.fallback_reason(Stage::CompetitorSearch),
        Some(&FallbackReason::NoKeywords)
    );
    for stage in [Stage::Swot, Stage::MarketAnalysis, Stage::FinalSummary] {
        assert!(matches!(
            run.fallback_reason(stage),
            Some(FallbackReason::RequestFailed(_))
        ));
    }
}

#[tokio::test]
async fn e2e_report_json_has_every_field() {
    let generator = Arc::new(ScriptedGenerator::new("gemini-test", ["not json", "nor this", "nope"]));
    let pipeline = ValidationPipeline::new(
        GenerativeAnalyst::new(generator),
        CompetitorSearch::disabled(),
    );

    let report = pipeline.run(&test_idea()).await;
    let value = serde_json::to_value(&report).unwrap();

    for key in [
        "report_id",
        "idea_name",
        "overall_score",
        "executive_summary",
        "swot_analysis",
        "market_analysis",
        "competitor_analysis",
        "recommended_next_steps",
    ] {
        assert!(!value[key].is_null(), "missing {key}");
    }
    for list in ["strengths", "weaknesses", "opportunities", "threats"] {
        assert!(value["swot_analysis"][list].is_array(), "{list} not a list");
    }
    assert!(value["market_analysis"]["potential_keywords"].is_array());
}

#[tokio::test]
async fn e2e_out_of_range_score_is_clamped() {
    let generator = Arc::new(ScriptedGenerator::new(
        "gemini-test",
        [
            r#"{"strengths":["a"]}"#,
            r#"{"audience_profile":"p","potential_keywords":[]}"#,
            r#"{"executive_summary":"meh","overall_score":-3,"recommended_next_steps":["x","y","z"]}"#,
        ],
    ));
    let pipeline = ValidationPipeline::new(
        GenerativeAnalyst::new(generator),
        CompetitorSearch::disabled(),
    );

    let report = pipeline.run(&test_idea()).await;

    assert_eq!(report.overall_score, 1.0);
    assert_eq!(report.executive_summary, "meh");
}

#[tokio::test]
async fn e2e_report_ids_are_unique() {
    let build = || {
        ValidationPipeline::new(
            GenerativeAnalyst::new(Arc::new(ScriptedGenerator::new("m", Vec::<String>::new()))),
            CompetitorSearch::disabled(),
        )
    };

    let first = build().run(&test_idea()).await;
    let second = build().run(&test_idea()).await;

    assert_ne!(first.report_id, second.report_id);
}
