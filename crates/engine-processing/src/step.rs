use crate::{
    error::StepError,
    load::LoadStepEngine,
    scope::RunScope,
};
use model::execution::{
    pipeline::{ExportStep, PipelineStep, StepKind, TransformStep},
    plan::Variables,
    result::StepOutcome,
};
use tracing::{debug, info};

/// Runs one step of any kind within a run scope.
#[derive(Clone)]
pub struct StepExecutor {
    loads: LoadStepEngine,
}

impl StepExecutor {
    pub fn new(loads: LoadStepEngine) -> Self {
        StepExecutor { loads }
    }

    pub fn load_engine(&self) -> &LoadStepEngine {
        &self.loads
    }

    pub async fn execute(
        &self,
        scope: &RunScope,
        step: &PipelineStep,
    ) -> Result<StepOutcome, StepError> {
        debug!(step_id = %step.id, step_type = %step.step_type(), "Executing step");
        match &step.kind {
            StepKind::Load(load) => {
                let source = scope.resolve_source(&load.source_name);
                let out = self
                    .loads
                    .execute(scope.pipeline(), &step.id, load, source.as_ref())
                    .await
                    .map_err(|source| StepError::Load {
                        step_id: step.id.clone(),
                        source,
                    })?;
                Ok(StepOutcome::succeeded(step, out.rows_affected).with_message(format!(
                    "{} {} rows into {}",
                    out.mode, out.rows_affected, load.table_name
                )))
            }
            StepKind::Transform(transform) => self.transform(scope, step, transform).await,
            StepKind::Export(export) => self.export(step, export).await,
            StepKind::Source(def) => {
                def.validate().map_err(|source| StepError::Definition {
                    step_id: step.id.clone(),
                    source,
                })?;
                // Registered when the scope was built.
                Ok(StepOutcome::succeeded(step, 0)
                    .with_message(format!("source '{}' registered", def.name)))
            }
        }
    }

    async fn transform(
        &self,
        scope: &RunScope,
        step: &PipelineStep,
        transform: &TransformStep,
    ) -> Result<StepOutcome, StepError> {
        let sql = substitute_variables(&step.id, &transform.sql, scope.variables())?;
        let rows = self
            .loads
            .warehouse()
            .execute_sql(&sql)
            .await
            .map_err(|source| StepError::Warehouse {
                step_id: step.id.clone(),
                source,
            })?;

        info!(step_id = %step.id, target = ?transform.target_table, rows, "Transform executed");
        Ok(StepOutcome::succeeded(step, rows))
    }

    async fn export(
        &self,
        step: &PipelineStep,
        export: &ExportStep,
    ) -> Result<StepOutcome, StepError> {
        let batch = self
            .loads
            .warehouse()
            .scan(&export.source_table)
            .await
            .map_err(|source| StepError::Warehouse {
                step_id: step.id.clone(),
                source,
            })?;

        let connector_err = |source| StepError::Connector {
            step_id: step.id.clone(),
            source,
        };
        let connector = self
            .loads
            .connectors()
            .connector(&export.connector_type)
            .map_err(connector_err)?;
        let written = connector
            .write(&export.object_id, batch)
            .await
            .map_err(connector_err)?;

        info!(
            step_id = %step.id,
            table = %export.source_table,
            object = %export.object_id,
            rows = written,
            "Export written"
        );
        Ok(StepOutcome::succeeded(step, written))
    }
}

/// Replaces `${name}` placeholders with run variables.
///
/// Strings are inserted verbatim; callers quote them in the statement.
pub fn substitute_variables(
    step_id: &str,
    sql: &str,
    variables: &Variables,
) -> Result<String, StepError> {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated placeholder, leave the tail untouched.
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let name = after[..end].trim();
        let value = variables
            .get(name)
            .ok_or_else(|| StepError::UndefinedVariable {
                step_id: step_id.to_string(),
                name: name.to_string(),
            })?;
        out.push_str(&value.as_string().unwrap_or_else(|| value.to_string()));
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
