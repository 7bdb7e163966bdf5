use std::collections::{HashMap, HashSet};

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Serialize;

use crate::domains::answer::TargetNode;
use crate::error::{ArborBotError, Result};
use crate::stores::schema::{edges, nodes, workflows};
use crate::stores::{
    connect, map_unique_violation, normalize, now_ts, SqliteAsyncConn, SqlitePool, SqlitePooledConn,
};

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct Workflow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct GraphNode {
    pub id: i32,
    pub workflow_id: i32,
    pub text: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct GraphEdge {
    pub id: i32,
    pub workflow_id: i32,
    pub source_node_id: i32,
    pub target_node_id: i32,
    pub created_at: i64,
}

/// Result of a graph-tier match: the target node texts plus drill-down flags.
#[derive(Debug, Clone)]
pub struct GraphMatch {
    pub answers: Vec<String>,
    pub target_nodes: Vec<TargetNode>,
}

#[derive(Insertable)]
#[diesel(table_name = workflows)]
struct NewWorkflow<'a> {
    name: &'a str,
    description: Option<&'a str>,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = nodes)]
struct NewNode<'a> {
    workflow_id: i32,
    text: &'a str,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = edges)]
struct NewEdge {
    workflow_id: i32,
    source_node_id: i32,
    target_node_id: i32,
    created_at: i64,
}

/// Directed node/edge store grouped by workflow, read by the graph tier and
/// mutated by the (out-of-scope) editing surface.
pub struct GraphStore {
    pool: SqlitePool,
}

impl GraphStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = connect(sqlite_path.as_ref()).await?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| ArborBotError::Runtime(e.to_string()))
    }

    pub async fn create_workflow(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Workflow> {
        let now = now_ts();
        let new = NewWorkflow {
            name,
            description,
            created_at: now,
            updated_at: now,
        };
        let mut conn = self.conn().await?;
        diesel::insert_into(workflows::table)
            .values(&new)
            .execute(&mut conn)
            .await?;
        let row: Workflow = workflows::table
            .order(workflows::id.desc())
            .first(&mut conn)
            .await?;
        Ok(row)
    }

    pub async fn get_workflow(&self, workflow_id: i32) -> Result<Workflow> {
        let mut conn = self.conn().await?;
        workflows::table
            .filter(workflows::id.eq(workflow_id))
            .first(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| ArborBotError::NotFound(format!("workflow {workflow_id}")))
    }

    pub async fn list_workflows(&self) -> Result<Vec<Workflow>> {
        let mut conn = self.conn().await?;
        let rows = workflows::table
            .order(workflows::created_at.desc())
            .load(&mut conn)
            .await?;
        Ok(rows)
    }

    /// Removes the workflow together with every node and edge it owns.
    pub async fn delete_workflow(&self, workflow_id: i32) -> Result<()> {
        let mut conn = self.conn().await?;
        let deleted = conn
            .transaction::<_, ArborBotError, _>(|conn| {
                async move {
                    diesel::delete(edges::table.filter(edges::workflow_id.eq(workflow_id)))
                        .execute(conn)
                        .await?;
                    diesel::delete(nodes::table.filter(nodes::workflow_id.eq(workflow_id)))
                        .execute(conn)
                        .await?;
                    let deleted =
                        diesel::delete(workflows::table.filter(workflows::id.eq(workflow_id)))
                            .execute(conn)
                            .await?;
                    Ok(deleted)
                }
                .scope_boxed()
            })
            .await?;
        if deleted == 0 {
            return Err(ArborBotError::NotFound(format!("workflow {workflow_id}")));
        }
        Ok(())
    }

    pub async fn create_node(&self, workflow_id: i32, text: &str) -> Result<GraphNode> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ArborBotError::Validation(
                "node text must not be empty".to_string(),
            ));
        }
        self.get_workflow(workflow_id).await?;

        let new = NewNode {
            workflow_id,
            text: trimmed,
            created_at: now_ts(),
        };
        let mut conn = self.conn().await?;
        diesel::insert_into(nodes::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| map_unique_violation(e, "node"))?;
        let row: GraphNode = nodes::table
            .filter(nodes::workflow_id.eq(workflow_id))
            .order(nodes::id.desc())
            .first(&mut conn)
            .await?;
        Ok(row)
    }

    pub async fn list_nodes(&self, workflow_id: i32) -> Result<Vec<GraphNode>> {
        let mut conn = self.conn().await?;
        let rows = nodes::table
            .filter(nodes::workflow_id.eq(workflow_id))
            .order(nodes::id.asc())
            .load(&mut conn)
            .await?;
        Ok(rows)
    }

    /// Removes the node and every edge touching it.
    pub async fn delete_node(&self, node_id: i32) -> Result<()> {
        let mut conn = self.conn().await?;
        let deleted = conn
            .transaction::<_, ArborBotError, _>(|conn| {
                async move {
                    diesel::delete(
                        edges::table.filter(
                            edges::source_node_id
                                .eq(node_id)
                                .or(edges::target_node_id.eq(node_id)),
                        ),
                    )
                    .execute(conn)
                    .await?;
                    let deleted = diesel::delete(nodes::table.filter(nodes::id.eq(node_id)))
                        .execute(conn)
                        .await?;
                    Ok(deleted)
                }
                .scope_boxed()
            })
            .await?;
        if deleted == 0 {
            return Err(ArborBotError::NotFound(format!("node {node_id}")));
        }
        Ok(())
    }

    pub async fn create_edge(
        &self,
        workflow_id: i32,
        source_node_id: i32,
        target_node_id: i32,
    ) -> Result<GraphEdge> {
        let mut conn = self.conn().await?;
        let endpoints: Vec<GraphNode> = nodes::table
            .filter(nodes::workflow_id.eq(workflow_id))
            .filter(nodes::id.eq_any([source_node_id, target_node_id]))
            .load(&mut conn)
            .await?;
        for id in [source_node_id, target_node_id] {
            if !endpoints.iter().any(|n| n.id == id) {
                return Err(ArborBotError::NotFound(format!(
                    "node {id} in workflow {workflow_id}"
                )));
            }
        }

        let new = NewEdge {
            workflow_id,
            source_node_id,
            target_node_id,
            created_at: now_ts(),
        };
        diesel::insert_into(edges::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| map_unique_violation(e, "edge"))?;
        let row: GraphEdge = edges::table
            .filter(edges::workflow_id.eq(workflow_id))
            .order(edges::id.desc())
            .first(&mut conn)
            .await?;
        Ok(row)
    }

    pub async fn list_edges(&self, workflow_id: i32) -> Result<Vec<GraphEdge>> {
        let mut conn = self.conn().await?;
        let rows = edges::table
            .filter(edges::workflow_id.eq(workflow_id))
            .order(edges::id.asc())
            .load(&mut conn)
            .await?;
        Ok(rows)
    }

    pub async fn delete_edge(&self, edge_id: i32) -> Result<()> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(edges::table.filter(edges::id.eq(edge_id)))
            .execute(&mut conn)
            .await?;
        if deleted == 0 {
            return Err(ArborBotError::NotFound(format!("edge {edge_id}")));
        }
        Ok(())
    }

    /// Graph-tier matcher. Exact node-text equality wins; when the exact match
    /// has no outgoing edges, falls through to partial containment matching
    /// across all candidate nodes. `workflow_id = None` searches every
    /// workflow. Read-only.
    pub async fn match_question(
        &self,
        question: &str,
        workflow_id: Option<i32>,
    ) -> Result<Option<GraphMatch>> {
        let normalized = normalize(question);
        if normalized.is_empty() {
            return Ok(None);
        }

        let mut conn = self.conn().await?;
        let candidates: Vec<GraphNode> = match workflow_id {
            Some(id) => {
                nodes::table
                    .filter(nodes::workflow_id.eq(id))
                    .order(nodes::id.asc())
                    .load(&mut conn)
                    .await?
            }
            None => nodes::table.order(nodes::id.asc()).load(&mut conn).await?,
        };

        let exact_ids: Vec<i32> = candidates
            .iter()
            .filter(|n| normalize(&n.text) == normalized)
            .map(|n| n.id)
            .collect();
        if !exact_ids.is_empty() {
            if let Some(matched) = collect_targets(&mut conn, &exact_ids).await? {
                return Ok(Some(matched));
            }
        }

        let partial_ids: Vec<i32> = candidates
            .iter()
            .filter(|n| {
                let text = normalize(&n.text);
                !text.is_empty() && (text.contains(&normalized) || normalized.contains(&text))
            })
            .map(|n| n.id)
            .collect();
        if partial_ids.is_empty() {
            return Ok(None);
        }
        collect_targets(&mut conn, &partial_ids).await
    }
}

/// Unions the outgoing targets of `source_ids`, deduplicated by node id in
/// first-seen edge order. A target is flagged `is_source` when it has outgoing
/// edges of its own.
async fn collect_targets(
    conn: &mut SqliteAsyncConn,
    source_ids: &[i32],
) -> Result<Option<GraphMatch>> {
    let edge_rows: Vec<GraphEdge> = edges::table
        .filter(edges::source_node_id.eq_any(source_ids))
        .order(edges::id.asc())
        .load(conn)
        .await?;

    let mut seen = HashSet::new();
    let mut target_ids = Vec::new();
    for edge in &edge_rows {
        if seen.insert(edge.target_node_id) {
            target_ids.push(edge.target_node_id);
        }
    }
    if target_ids.is_empty() {
        return Ok(None);
    }

    let target_rows: Vec<GraphNode> = nodes::table
        .filter(nodes::id.eq_any(&target_ids))
        .load(conn)
        .await?;
    let by_id: HashMap<i32, &GraphNode> = target_rows.iter().map(|n| (n.id, n)).collect();

    let outgoing: Vec<i32> = edges::table
        .filter(edges::source_node_id.eq_any(&target_ids))
        .select(edges::source_node_id)
        .load(conn)
        .await?;
    let has_outgoing: HashSet<i32> = outgoing.into_iter().collect();

    let mut answers = Vec::with_capacity(target_ids.len());
    let mut target_nodes = Vec::with_capacity(target_ids.len());
    for id in target_ids {
        let Some(node) = by_id.get(&id) else {
            continue;
        };
        answers.push(node.text.clone());
        target_nodes.push(TargetNode {
            text: node.text.clone(),
            is_source: has_outgoing.contains(&id),
        });
    }

    Ok(Some(GraphMatch {
        answers,
        target_nodes,
    }))
}
