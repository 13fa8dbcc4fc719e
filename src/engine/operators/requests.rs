// SPDX-License-Identifier: MIT

//! The `requests` operator: general HTTP invocation of graph services
//!
//! Takes `url` (with `{placeholder}` slots filled from the resolved args)
//! and exactly one of:
//!   - `body`: a JSON tree POSTed as-is,
//!   - `MaQ`: a declarative-query program whose generated questions are
//!     each POSTed and whose responses aggregate into one fragment,
//!   - neither: a plain GET.
//!
//! Status 200 and 202 are success; anything else raises an upstream error.

use super::{check_status, fill_url};
use crate::engine::fold::{kgs, EDGES_PATH, NODES_PATH};
use crate::engine::operator::{Event, Operator};
use crate::engine::query::{maq, JsonPath};
use crate::ops::error::EngineError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub struct RequestsOperator;

#[async_trait]
impl Operator for RequestsOperator {
    fn name(&self) -> &str {
        "requests"
    }

    async fn invoke(&self, event: Event) -> Result<Value, EngineError> {
        let pattern = event.require_str("url")?;
        let url = fill_url(pattern, &event.args);

        if let Some(program) = event.arg("MaQ").and_then(Value::as_str) {
            return run_program(&event, &url, program).await;
        }

        if let Some(body) = event.arg("body") {
            log::info!("{}: POST {url}", event.job_name);
            let response = event.context.http().post_json(&url, body, &[]).await?;
            check_status(response.status, &response.body)?;
            return response.json();
        }

        log::info!("{}: GET {url}", event.job_name);
        let response = event.context.http().get(&url, &[]).await?;
        check_status(response.status, &response.body)?;
        response.json()
    }
}

/// Execute a declarative-query program: each SELECT's questions are
/// POSTed to the service and every response folds into one fragment
async fn run_program(event: &Event, url: &str, program: &str) -> Result<Value, EngineError> {
    let statements = maq::parse(program)?;
    let mut bindings: Map<String, Value> = Map::new();
    let mut nodes: Vec<Value> = Vec::new();
    let mut edges: Vec<Value> = Vec::new();

    for statement in &statements {
        match statement {
            maq::Statement::Set(set) => {
                bindings.insert(set.name.clone(), set.value.clone());
            }
            maq::Statement::Select(select) => {
                let candidates = candidate_values(event, select, &bindings).await?;
                let questions = select.generate_questions(&candidates);
                log::info!(
                    "{}: {} question(s) for service {}",
                    event.job_name,
                    questions.len(),
                    select.service
                );

                let mut responses = Vec::with_capacity(questions.len());
                for question in &questions {
                    let response = event.context.http().post_json(url, question, &[]).await?;
                    check_status(response.status, &response.body)?;
                    // Responses in the standard shape are already lists of
                    // result groups; keep the aggregate one level deep.
                    match response.json()? {
                        Value::Array(groups) => responses.extend(groups),
                        other => responses.push(other),
                    }
                }

                let aggregated = Value::Array(responses);
                collect_graph(&aggregated, &mut nodes, &mut edges)?;

                for output in &select.outputs {
                    let value = match &output.path {
                        Some(path) => Value::Array(JsonPath::parse(path)?.select(&aggregated)),
                        None => aggregated.clone(),
                    };
                    bindings.insert(output.name.clone(), value);
                }
            }
        }
    }

    Ok(kgs(nodes, edges))
}

/// Resolve each concept's candidate values from the WHERE constraints
async fn candidate_values(
    event: &Event,
    select: &maq::SelectStatement,
    bindings: &Map<String, Value>,
) -> Result<BTreeMap<String, Vec<Value>>, EngineError> {
    let mut candidates: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for predicate in select.candidate_predicates() {
        let resolved = resolve_operand(event, &predicate.right, bindings).await?;
        let values = match resolved {
            Value::Array(items) => items,
            // Comma-separated strings are candidate lists, like inputs.
            Value::String(s) if s.contains(',') => s
                .split(',')
                .map(|part| Value::String(part.trim().to_string()))
                .collect(),
            scalar => vec![scalar],
        };
        candidates
            .entry(predicate.left.clone())
            .or_default()
            .extend(values);
    }
    Ok(candidates)
}

/// `$name` operands read statement-local bindings first, then run state
async fn resolve_operand(
    event: &Event,
    operand: &Value,
    bindings: &Map<String, Value>,
) -> Result<Value, EngineError> {
    if let Some(name) = operand.as_str().and_then(|s| s.strip_prefix('$')) {
        if let Some(bound) = bindings.get(name) {
            return Ok(bound.clone());
        }
        return event.context.lookup_var(name).await;
    }
    Ok(operand.clone())
}

/// Pull node and edge lists out of an aggregated response set
fn collect_graph(
    responses: &Value,
    nodes: &mut Vec<Value>,
    edges: &mut Vec<Value>,
) -> Result<(), EngineError> {
    nodes.extend(JsonPath::parse(NODES_PATH)?.select(responses));
    edges.extend(JsonPath::parse(EDGES_PATH)?.select(responses));
    // Plain knowledge_graph responses carry their lists at the top level.
    nodes.extend(JsonPath::parse("$.[*].knowledge_graph.nodes.[*]")?.select(responses));
    edges.extend(JsonPath::parse("$.[*].knowledge_graph.edges.[*]")?.select(responses));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::facade::test_support::{context_for, StubHttp};
    use crate::engine::facade::{Capabilities, WorkflowContext};
    use crate::engine::loader::WorkflowLoader;
    use crate::engine::plan;
    use crate::ops::capability::http::HttpResponse;
    use crate::ops::capability::{MemoryCache, MemoryGraphStore, TokioClock};
    use serde_json::json;
    use std::sync::Arc;

    const DOC: &str = r#"
info:
  version: 0.1.0
workflow:
  return:
    code: requests
    args:
      url: "http://reasoner/query"
"#;

    fn event_with_http(
        responses: Vec<HttpResponse>,
        args: Map<String, Value>,
    ) -> Event {
        let spec = WorkflowLoader::new(vec![]).load_str(DOC).unwrap();
        let plan = plan::build(spec).unwrap();
        let caps = Capabilities {
            graph: Arc::new(MemoryGraphStore::new()),
            cache: Arc::new(MemoryCache::new()),
            http: StubHttp::new(responses),
            clock: Arc::new(TokioClock),
        };
        let ctx = WorkflowContext::new(plan, Map::new(), caps);
        let node = ctx.plan().job("return").unwrap().spec.clone();
        Event {
            context: ctx,
            job_name: "return".to_string(),
            node,
            op: None,
            args,
        }
    }

    fn ok(body: Value) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_plain_get_returns_body() {
        let event = event_with_http(
            vec![ok(json!({"answer": 42}))],
            args(&[("url", json!("http://svc/x"))]),
        );
        let result = RequestsOperator.invoke(event).await.unwrap();
        assert_eq!(result, json!({"answer": 42}));
    }

    #[tokio::test]
    async fn test_post_body() {
        let event = event_with_http(
            vec![ok(json!({"echo": true}))],
            args(&[
                ("url", json!("http://svc/x")),
                ("body", json!({"question": "q"})),
            ]),
        );
        let result = RequestsOperator.invoke(event).await.unwrap();
        assert_eq!(result, json!({"echo": true}));
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces_status() {
        let event = event_with_http(
            vec![HttpResponse {
                status: 500,
                body: "internal error".to_string(),
            }],
            args(&[("url", json!("http://svc/x"))]),
        );
        match RequestsOperator.invoke(event).await {
            Err(EngineError::Upstream { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_accepted_status_is_success() {
        let event = event_with_http(
            vec![HttpResponse {
                status: 202,
                body: json!({"queued": true}).to_string(),
            }],
            args(&[("url", json!("http://svc/x"))]),
        );
        assert!(RequestsOperator.invoke(event).await.is_ok());
    }

    #[tokio::test]
    async fn test_maq_program_posts_each_question() {
        let answer = kgs(
            vec![json!({"id": "HGNC:1", "type": "gene"})],
            vec![],
        );
        // Two candidate drugs -> two questions -> two POSTs.
        let event = event_with_http(
            vec![ok(answer.clone()), ok(answer)],
            args(&[
                ("url", json!("http://reasoner/query")),
                (
                    "MaQ",
                    json!(
                        "SET drugs = 'CHEMBL:1,CHEMBL:2'\n\
                         SELECT chemical_substance->gene FROM $reasoner \
                         WHERE chemical_substance in $drugs"
                    ),
                ),
            ]),
        );

        let result = RequestsOperator.invoke(event).await.unwrap();
        let nodes = JsonPath::parse(NODES_PATH).unwrap().select(&result);
        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_maq_bad_program_is_rejected() {
        let event = event_with_http(
            vec![],
            args(&[
                ("url", json!("http://svc/x")),
                ("MaQ", json!("SELECT FROM nothing")),
            ]),
        );
        assert!(matches!(
            RequestsOperator.invoke(event).await,
            Err(EngineError::BadExpression(_))
        ));
    }
}
