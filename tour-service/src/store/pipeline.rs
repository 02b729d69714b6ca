//! Multi-stage aggregation pipelines
//!
//! A [`Pipeline`] is an ordered list of typed [`Stage`]s run over every
//! document of a collection. Stages are built in code rather than parsed
//! from JSON, so an invalid pipeline cannot be expressed.
//!
//! # Example
//!
//! ```rust
//! use tour_service::store::{Accumulator, Expr, FilterCondition, Pipeline, SortKey, Stage};
//!
//! let pipeline = Pipeline::new()
//!     .with_stage(Stage::Match(vec![FilterCondition::gte("ratingsAverage", 4.5)]))
//!     .with_stage(Stage::Group {
//!         key: Expr::to_upper(Expr::field("difficulty")),
//!         accumulators: vec![("numTours".into(), Accumulator::Sum(Expr::literal(1)))],
//!     })
//!     .with_stage(Stage::Sort(vec![SortKey::ascending("numTours")]));
//!
//! assert_eq!(pipeline.stages().len(), 3);
//! ```

use std::collections::HashMap;

use chrono::Datelike;
use serde_json::Value;

use super::document::{resolve, set_field, Document, ID_FIELD};
use super::filter::{matches_all, FilterCondition};
use super::query::{sort_documents, Projection, SortKey};
use super::value::{compare_values, number_to_value, parse_date};

/// Expression evaluated against one document
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant
    Literal(Value),
    /// The value at a field path (missing resolves to null)
    Field(String),
    /// Upper-cased string value
    ToUpper(Box<Expr>),
    /// Month (1-12) of a date value
    Month(Box<Expr>),
}

impl Expr {
    /// Reference a field path
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }

    /// A constant value
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Upper-case the result of another expression
    #[must_use]
    pub fn to_upper(inner: Expr) -> Self {
        Self::ToUpper(Box::new(inner))
    }

    /// Month of the date produced by another expression
    #[must_use]
    pub fn month(inner: Expr) -> Self {
        Self::Month(Box::new(inner))
    }

    /// Evaluate against a document
    #[must_use]
    pub fn eval(&self, doc: &Document) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Field(path) => resolve(doc, path).cloned().unwrap_or(Value::Null),
            Self::ToUpper(inner) => match inner.eval(doc) {
                Value::String(s) => Value::String(s.to_uppercase()),
                Value::Null => Value::String(String::new()),
                other => Value::String(other.to_string().to_uppercase()),
            },
            Self::Month(inner) => date_part(&inner.eval(doc), |d| i64::from(d.month())),
        }
    }
}

fn date_part(value: &Value, part: impl Fn(&chrono::DateTime<chrono::Utc>) -> i64) -> Value {
    value
        .as_str()
        .and_then(parse_date)
        .map(|date| Value::Number(part(&date).into()))
        .unwrap_or(Value::Null)
}

/// Group accumulators
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Sum of numeric values
    Sum(Expr),
    /// Mean of numeric values
    Avg(Expr),
    /// Smallest non-null value
    Min(Expr),
    /// Largest non-null value
    Max(Expr),
    /// Every value, in input order
    Push(Expr),
}

enum AccumulatorState {
    Sum(f64),
    Avg { sum: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    Push(Vec<Value>),
}

impl AccumulatorState {
    fn start(accumulator: &Accumulator) -> Self {
        match accumulator {
            Accumulator::Sum(_) => Self::Sum(0.0),
            Accumulator::Avg(_) => Self::Avg { sum: 0.0, count: 0 },
            Accumulator::Min(_) => Self::Min(None),
            Accumulator::Max(_) => Self::Max(None),
            Accumulator::Push(_) => Self::Push(Vec::new()),
        }
    }

    fn feed(&mut self, accumulator: &Accumulator, doc: &Document) {
        match (accumulator, self) {
            (Accumulator::Sum(expr), Self::Sum(total)) => {
                if let Some(n) = expr.eval(doc).as_f64() {
                    *total += n;
                }
            }
            (Accumulator::Avg(expr), Self::Avg { sum, count }) => {
                if let Some(n) = expr.eval(doc).as_f64() {
                    *sum += n;
                    *count += 1;
                }
            }
            (Accumulator::Min(expr), Self::Min(current)) => {
                let value = expr.eval(doc);
                if !value.is_null() {
                    let replace = current
                        .as_ref()
                        .map_or(true, |cur| compare_values(&value, cur).is_lt());
                    if replace {
                        *current = Some(value);
                    }
                }
            }
            (Accumulator::Max(expr), Self::Max(current)) => {
                let value = expr.eval(doc);
                if !value.is_null() {
                    let replace = current
                        .as_ref()
                        .map_or(true, |cur| compare_values(&value, cur).is_gt());
                    if replace {
                        *current = Some(value);
                    }
                }
            }
            (Accumulator::Push(expr), Self::Push(values)) => values.push(expr.eval(doc)),
            _ => {}
        }
    }

    fn finish(self) -> Value {
        match self {
            Self::Sum(total) => number_to_value(total),
            Self::Avg { sum, count } if count > 0 => number_to_value(sum / count as f64),
            Self::Avg { .. } => Value::Null,
            Self::Min(v) | Self::Max(v) => v.unwrap_or(Value::Null),
            Self::Push(values) => Value::Array(values),
        }
    }
}

/// One pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep documents satisfying every condition
    Match(Vec<FilterCondition>),
    /// Group by a key expression; the key becomes `_id`
    Group {
        /// Grouping expression
        key: Expr,
        /// Output fields and how they accumulate
        accumulators: Vec<(String, Accumulator)>,
    },
    /// Stable multi-key sort
    Sort(Vec<SortKey>),
    /// Keep at most `n` documents
    Limit(u64),
    /// Reshape documents
    Project(Projection),
    /// Emit one document per element of an array field
    Unwind(String),
    /// Add or overwrite computed fields
    AddFields(Vec<(String, Expr)>),
}

/// An ordered aggregation pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// An empty pipeline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Insert a stage in front of every existing stage
    #[must_use]
    pub fn with_leading_stage(mut self, stage: Stage) -> Self {
        self.stages.insert(0, stage);
        self
    }

    /// The stages in execution order
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run the pipeline over a set of documents
    #[must_use]
    pub fn execute(&self, docs: Vec<Document>) -> Vec<Document> {
        self.stages
            .iter()
            .fold(docs, |docs, stage| run_stage(stage, docs))
    }
}

fn run_stage(stage: &Stage, docs: Vec<Document>) -> Vec<Document> {
    match stage {
        Stage::Match(filters) => docs
            .into_iter()
            .filter(|doc| matches_all(filters, doc))
            .collect(),
        Stage::Group { key, accumulators } => group(docs, key, accumulators),
        Stage::Sort(keys) => {
            let mut docs = docs;
            sort_documents(&mut docs, keys);
            docs
        }
        Stage::Limit(n) => docs.into_iter().take(*n as usize).collect(),
        Stage::Project(projection) => docs.into_iter().map(|doc| projection.apply(doc)).collect(),
        Stage::Unwind(path) => unwind(docs, path),
        Stage::AddFields(fields) => docs
            .into_iter()
            .map(|mut doc| {
                for (name, expr) in fields {
                    let value = expr.eval(&doc);
                    set_field(&mut doc, name, value);
                }
                doc
            })
            .collect(),
    }
}

fn group(docs: Vec<Document>, key: &Expr, accumulators: &[(String, Accumulator)]) -> Vec<Document> {
    let mut groups: HashMap<String, (Value, Vec<AccumulatorState>)> = HashMap::new();
    let mut insertion_order: Vec<String> = Vec::new();

    for doc in &docs {
        let key_value = key.eval(doc);
        let key_str = key_value.to_string();

        let (_, states) = groups.entry(key_str.clone()).or_insert_with(|| {
            insertion_order.push(key_str);
            let initial = accumulators
                .iter()
                .map(|(_, acc)| AccumulatorState::start(acc))
                .collect();
            (key_value, initial)
        });

        for ((_, acc), state) in accumulators.iter().zip(states.iter_mut()) {
            state.feed(acc, doc);
        }
    }

    insertion_order
        .into_iter()
        .filter_map(|key_str| groups.remove(&key_str))
        .map(|(key_value, states)| {
            let mut out = Document::new();
            out.insert(ID_FIELD.to_string(), key_value);
            for ((name, _), state) in accumulators.iter().zip(states) {
                out.insert(name.clone(), state.finish());
            }
            out
        })
        .collect()
}

fn unwind(docs: Vec<Document>, path: &str) -> Vec<Document> {
    let mut out = Vec::new();
    for doc in docs {
        match resolve(&doc, path).cloned() {
            Some(Value::Array(items)) => {
                for item in items {
                    let mut copy = doc.clone();
                    set_field(&mut copy, path, item);
                    out.push(copy);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => out.push(doc),
        }
    }
    out
}
