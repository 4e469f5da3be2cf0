use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use fintrack_domain::{Goal, GoalPatch, GoalStatus, NewGoal, OwnerId};

use crate::storage::GoalRepository;
use crate::time::Clock;
use crate::validation;
use crate::CoreError;

/// Savings goals. Status follows the amounts; Cancelled is terminal.
#[derive(Clone)]
pub struct GoalService {
    goals: Arc<dyn GoalRepository>,
    clock: Arc<dyn Clock>,
}

impl GoalService {
    pub fn new(goals: Arc<dyn GoalRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { goals, clock }
    }

    pub async fn create(&self, owner_id: OwnerId, data: NewGoal) -> Result<Goal, CoreError> {
        validation::required_text("name", &data.name)?;
        validation::positive_amount("target amount", data.target_amount)?;
        if let Some(current) = data.current_amount {
            validation::non_negative_amount("current amount", current)?;
        }
        validation::date_order(data.start_date, data.target_date)?;

        let goal = Goal::new(owner_id, data, self.clock.now());
        self.goals.insert_goal(goal.clone()).await?;
        tracing::debug!(%owner_id, goal_id = %goal.id, status = %goal.status, "goal created");
        Ok(goal)
    }

    /// Goals of the owner, newest first, optionally restricted to one status.
    pub async fn list(
        &self,
        owner_id: OwnerId,
        status: Option<GoalStatus>,
    ) -> Result<Vec<Goal>, CoreError> {
        let mut goals = self.goals.find_goals(owner_id, status).await?;
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    pub async fn get(&self, owner_id: OwnerId, id: Uuid) -> Result<Goal, CoreError> {
        self.goals
            .find_goal(owner_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Goal", id))
    }

    pub async fn update(
        &self,
        owner_id: OwnerId,
        id: Uuid,
        patch: GoalPatch,
    ) -> Result<Goal, CoreError> {
        let mut goal = self.get(owner_id, id).await?;
        let requested = patch.status;

        if let Some(name) = patch.name {
            goal.name = name.trim().to_string();
        }
        if let Some(target) = patch.target_amount {
            goal.target_amount = target;
        }
        if let Some(current) = patch.current_amount {
            goal.current_amount = current;
        }
        if let Some(start) = patch.start_date {
            goal.start_date = start;
        }
        if let Some(target_date) = patch.target_date {
            goal.target_date = target_date;
        }
        if let Some(category) = patch.category {
            goal.category = category;
        }
        validation::required_text("name", &goal.name)?;
        validation::positive_amount("target amount", goal.target_amount)?;
        validation::non_negative_amount("current amount", goal.current_amount)?;
        validation::date_order(goal.start_date, goal.target_date)?;

        let now = self.clock.now();
        goal.updated_at = now;
        Self::resolve_status(&mut goal, requested, now)?;
        self.store(goal).await
    }

    /// Records the amount saved so far and re-derives the status.
    pub async fn set_progress(
        &self,
        owner_id: OwnerId,
        id: Uuid,
        current_amount: Decimal,
    ) -> Result<Goal, CoreError> {
        validation::non_negative_amount("current amount", current_amount)?;
        let mut goal = self.get(owner_id, id).await?;
        goal.set_progress(current_amount, self.clock.now());
        self.store(goal).await
    }

    pub async fn cancel(&self, owner_id: OwnerId, id: Uuid) -> Result<Goal, CoreError> {
        let mut goal = self.get(owner_id, id).await?;
        goal.cancel(self.clock.now());
        self.store(goal).await
    }

    pub async fn delete(&self, owner_id: OwnerId, id: Uuid) -> Result<Goal, CoreError> {
        let goal = self
            .goals
            .delete_goal(owner_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Goal", id))?;
        tracing::debug!(%owner_id, goal_id = %id, "goal deleted");
        Ok(goal)
    }

    /// Applies an explicitly requested status on top of the derived one.
    fn resolve_status(
        goal: &mut Goal,
        requested: Option<GoalStatus>,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        match requested {
            Some(GoalStatus::Cancelled) => {
                goal.cancel(now);
                Ok(())
            }
            Some(status) if goal.status == GoalStatus::Cancelled => Err(CoreError::Validation(
                format!("a cancelled goal cannot move to {status}"),
            )),
            requested => {
                goal.refresh_status();
                match requested {
                    Some(status) if status != goal.status => Err(CoreError::Validation(format!(
                        "status {status} contradicts progress {} of {}",
                        goal.current_amount, goal.target_amount
                    ))),
                    _ => Ok(()),
                }
            }
        }
    }

    async fn store(&self, goal: Goal) -> Result<Goal, CoreError> {
        if !self.goals.replace_goal(&goal).await? {
            return Err(CoreError::not_found("Goal", goal.id));
        }
        tracing::debug!(
            owner_id = %goal.owner_id,
            goal_id = %goal.id,
            status = %goal.status,
            "goal saved"
        );
        Ok(goal)
    }
}
