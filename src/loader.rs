use crate::model::{Problem, ProblemError, TestId, TestSpec};
use ecow::eco_format;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed problem document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Problem(#[from] ProblemError),
}

/// Test ids may be written as strings or as integers.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Int(i64),
}

impl RawId {
    /// Integers render in decimal, so `1` and `"1"` name the same test and a document
    /// using both is rejected as a duplicate.
    pub fn to_id(&self) -> TestId {
        match self {
            RawId::Text(s) => s.as_str().into(),
            RawId::Int(i) => eco_format!("{}", i),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NodeRecord {
    pub id: RawId,
    pub p: f64,
    pub cost: f64,
}

/// `{"nodes": [{"id", "p", "cost"}], "edges": [[u, v]]}`
#[derive(Clone, Debug, Deserialize)]
pub struct ProblemDocument {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<(RawId, RawId)>,
}

impl ProblemDocument {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_problem(self) -> Result<Problem, ProblemError> {
        let tests = self
            .nodes
            .iter()
            .map(|node| TestSpec::new(node.id.to_id(), node.p, node.cost));
        let edges = self.edges.iter().map(|(u, v)| (u.to_id(), v.to_id()));
        Problem::new(tests, edges)
    }
}

pub fn parse_problem(text: &str) -> Result<Problem, LoadError> {
    Ok(ProblemDocument::from_json(text)?.into_problem()?)
}

pub fn load_problem<P: AsRef<Path>>(path: P) -> Result<Problem, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_problem(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_document() {
        let problem = parse_problem(
            r#"{
                "nodes": [
                    {"id": "a", "p": 0.5, "cost": 10},
                    {"id": "b", "p": 1.0, "cost": 1.5}
                ],
                "edges": [["b", "a"]]
            }"#,
        )
        .unwrap();

        assert_eq!(problem.len(), 2);
        assert_eq!(problem.edge_count(), 1);
        let a = problem.node("a").unwrap();
        assert_eq!(problem.test(a), &TestSpec::new("a", 0.5, 10.0));
    }

    #[test]
    fn test_integer_ids() {
        let problem = parse_problem(
            r#"{"nodes": [{"id": 1, "p": 0.5, "cost": 1}, {"id": 2, "p": 0.5, "cost": 2}],
                "edges": [[1, 2]]}"#,
        )
        .unwrap();

        let ids: Vec<&str> = problem.tests().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        let order = problem.resolve(&["2", "1"]).unwrap();
        assert!(!problem.is_feasible(&order));
    }

    #[test]
    fn test_integer_and_text_ids_collide() {
        let result = parse_problem(
            r#"{"nodes": [{"id": 1, "p": 0.5, "cost": 1}, {"id": "1", "p": 0.5, "cost": 2}],
                "edges": []}"#,
        );

        assert!(matches!(
            result,
            Err(LoadError::Problem(ProblemError::DuplicateId(id))) if id.as_str() == "1"
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let missing_edges = parse_problem(r#"{"nodes": []}"#);
        let bad_edge = parse_problem(
            r#"{"nodes": [{"id": "a", "p": 0.5, "cost": 1}], "edges": [["a"]]}"#,
        );
        let bad_number = parse_problem(
            r#"{"nodes": [{"id": "a", "p": "high", "cost": 1}], "edges": []}"#,
        );

        assert!(matches!(missing_edges, Err(LoadError::Json(_))));
        assert!(matches!(bad_edge, Err(LoadError::Json(_))));
        assert!(matches!(bad_number, Err(LoadError::Json(_))));
    }

    #[test]
    fn test_surfaces_model_errors() {
        let cyclic = parse_problem(
            r#"{"nodes": [{"id": "a", "p": 0.5, "cost": 1}, {"id": "b", "p": 0.5, "cost": 1}],
                "edges": [["a", "b"], ["b", "a"]]}"#,
        );
        let empty = parse_problem(r#"{"nodes": [], "edges": []}"#);

        assert!(matches!(
            cyclic,
            Err(LoadError::Problem(ProblemError::Cycle(_)))
        ));
        assert!(matches!(empty, Err(LoadError::Problem(ProblemError::Empty))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_problem("/definitely/not/here.json");
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
