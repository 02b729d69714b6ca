//! Tour model and reports
//!
//! Tours carry a derived `slug`, a hidden `createdAt`, and a
//! `secretTour` flag that keeps a tour out of every standard read.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::{
    format_date, number_to_value, Accumulator, Document, DocumentStore, Expr, FilterCondition,
    Pipeline, Projection, SortKey, Stage, ID_FIELD,
};

use super::hooks::{HookPipeline, QueryTimer, SecretTourFilter, SlugHook};
use super::repository::ModelRepository;
use super::schema::{FieldDef, Schema};

/// Difficulty levels a tour may declare
pub const DIFFICULTIES: &[&str] = &["easy", "medium", "difficult"];

/// Tours rated below this are left out of the statistics report
pub const STATS_RATING_THRESHOLD: f64 = 4.5;

/// Most months a monthly plan can list
pub const MONTHS_PER_PLAN: u64 = 12;

/// Field registry for tours
#[must_use]
pub fn tour_schema() -> Schema {
    Schema::new("Tour", "tours", "tour")
        .with_field(
            FieldDef::string("name")
                .required("A tour must have a name")
                .unique()
                .trim()
                .min_length(10, "A tour name must have more or equal than 10 characters")
                .max_length(40, "A tour name must have less or equal than 40 characters"),
        )
        .with_field(FieldDef::string("slug").managed())
        .with_field(FieldDef::number("duration").required("A tour must have a duration"))
        .with_field(FieldDef::number("maxGroupSize").required("A tour must have a max group size"))
        .with_field(
            FieldDef::string("difficulty")
                .required("A tour must have a difficulty")
                .one_of(DIFFICULTIES, "Difficulty is either: easy, medium, difficult"),
        )
        .with_field(
            FieldDef::number("ratingsAverage")
                .default_value(|| json!(4.5))
                .min(1.0, "Rating must be above 1.0")
                .max(5.0, "Rating must be below 5.0"),
        )
        .with_field(FieldDef::number("ratingQuantity").default_value(|| json!(0)))
        .with_field(FieldDef::number("rating").default_value(|| json!(4.5)))
        .with_field(FieldDef::number("price").required("A tour must have a price"))
        .with_field(FieldDef::number("priceDiscount"))
        .with_field(FieldDef::boolean(SecretTourFilter::FIELD).default_value(|| json!(false)))
        .with_field(
            FieldDef::string("summary")
                .trim()
                .required("A tour must have a summary"),
        )
        .with_field(FieldDef::string("description").trim())
        .with_field(FieldDef::string("imageCover").required("A tour must have a cover photo"))
        .with_field(FieldDef::string_array("images"))
        .with_field(
            FieldDef::date("createdAt")
                .managed()
                .hidden()
                .default_value(|| Value::String(format_date(&Utc::now()))),
        )
        .with_field(FieldDef::date_array("startDates"))
        .with_virtual("durationWeeks", duration_weeks)
}

fn duration_weeks(doc: &Document) -> Option<Value> {
    doc.get("duration")
        .and_then(Value::as_f64)
        .map(|days| number_to_value(days / 7.0))
}

/// Hooks every tour repository runs
#[must_use]
pub fn tour_hooks() -> HookPipeline {
    HookPipeline::new()
        .with_save_hook(SlugHook)
        .with_query_hook(SecretTourFilter)
        .with_query_hook(QueryTimer)
        .with_aggregate_hook(SecretTourFilter)
}

/// Repository for tours
pub type TourRepository<S> = ModelRepository<S>;

/// Build the tour repository over a store
pub fn tour_repository<S: DocumentStore>(store: Arc<S>) -> TourRepository<S> {
    ModelRepository::new(store, tour_schema(), tour_hooks())
}

/// Per-difficulty statistics for well-rated tours, cheapest first
#[must_use]
pub fn stats_pipeline() -> Pipeline {
    Pipeline::new()
        .with_stage(Stage::Match(vec![FilterCondition::gte(
            "ratingsAverage",
            STATS_RATING_THRESHOLD,
        )]))
        .with_stage(Stage::Group {
            key: Expr::to_upper(Expr::field("difficulty")),
            accumulators: vec![
                ("numTours".into(), Accumulator::Sum(Expr::literal(1))),
                ("numRatings".into(), Accumulator::Sum(Expr::field("ratingQuantity"))),
                ("avgRating".into(), Accumulator::Avg(Expr::field("ratingsAverage"))),
                ("avgPrice".into(), Accumulator::Avg(Expr::field("price"))),
                ("minPrice".into(), Accumulator::Min(Expr::field("price"))),
                ("maxPrice".into(), Accumulator::Max(Expr::field("price"))),
            ],
        })
        .with_stage(Stage::Sort(vec![SortKey::ascending("avgPrice")]))
}

/// Tour starts per month of `year`, busiest month first
///
/// Each start date counts once, so a tour starting twice in a month is
/// listed twice for that month.
#[must_use]
pub fn monthly_plan_pipeline(year: i32) -> Pipeline {
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single();
    let end = Utc
        .with_ymd_and_hms(year, 12, 31, 23, 59, 59)
        .single()
        .map(|end| end + chrono::Duration::milliseconds(999));

    let window = match (start, end) {
        (Some(start), Some(end)) => vec![
            FilterCondition::gte("startDates", start),
            FilterCondition::lte("startDates", end),
        ],
        // Out of chrono's range: nothing can match
        _ => vec![FilterCondition::in_list("startDates", Vec::new())],
    };

    Pipeline::new()
        .with_stage(Stage::Unwind("startDates".into()))
        .with_stage(Stage::Match(window))
        .with_stage(Stage::Group {
            key: Expr::month(Expr::field("startDates")),
            accumulators: vec![
                ("numTourStarts".into(), Accumulator::Sum(Expr::literal(1))),
                ("tours".into(), Accumulator::Push(Expr::field("name"))),
            ],
        })
        .with_stage(Stage::AddFields(vec![("month".into(), Expr::field(ID_FIELD))]))
        .with_stage(Stage::Project(Projection::exclude([ID_FIELD])))
        .with_stage(Stage::Sort(vec![SortKey::descending("numTourStarts")]))
        .with_stage(Stage::Limit(MONTHS_PER_PLAN))
}

/// One row of the statistics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    #[serde(rename = "_id")]
    pub difficulty: String,
    pub num_tours: u64,
    pub num_ratings: f64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// One row of the monthly plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    pub month: u32,
    pub num_tour_starts: u64,
    pub tours: Vec<String>,
}

/// Run the statistics report
pub async fn tour_stats<S: DocumentStore>(
    repository: &TourRepository<S>,
) -> super::RepositoryResult<Vec<DifficultyStats>> {
    let rows = repository.aggregate(stats_pipeline()).await?;
    decode_rows(rows)
}

/// Run the monthly plan report for one year
pub async fn monthly_plan<S: DocumentStore>(
    repository: &TourRepository<S>,
    year: i32,
) -> super::RepositoryResult<Vec<MonthlyPlan>> {
    let rows = repository.aggregate(monthly_plan_pipeline(year)).await?;
    decode_rows(rows)
}

fn decode_rows<T: serde::de::DeserializeOwned>(
    rows: Vec<Document>,
) -> super::RepositoryResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|e| {
                super::RepositoryError::database_error(
                    super::RepositoryOperation::Aggregate,
                    format!("unexpected report row: {e}"),
                )
            })
        })
        .collect()
}
