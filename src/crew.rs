//! Agents, tasks and the sequential crew runner

use std::fmt;
use serde::{Deserialize, Serialize};
use log::{debug, info, error};

use crate::error::Error;
use crate::request::CallOptions;
use crate::{LanguageModel, Prompt, Turn};

const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// A role-playing agent; pure configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent
{   pub role: String
  , pub goal: String
  , pub backstory: String
  , /// Log task progress at info level
    pub verbose: bool
}

impl Agent
{   pub fn new(
      role: impl Into<String>
    , goal: impl Into<String>
    , backstory: impl Into<String>
    ) -> Self
    {   Agent
        {   role: role.into()
          , goal: goal.into()
          , backstory: backstory.into()
          , verbose: false
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self
    {   self.verbose = verbose;
        self
    }

    /// Persona instruction sent as the system turn
    pub fn system_prompt(&self) -> String
    {   format!(
          "You are {}. {}\nYour personal goal is: {}",
          self.role, self.backstory.trim(), self.goal
        )
    }
}

/// One unit of work assigned to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task
{   pub description: String
  , pub expected_output: String
  , pub agent: Agent
}

impl Task
{   pub fn new(
      description: impl Into<String>
    , expected_output: impl Into<String>
    , agent: Agent
    ) -> Self
    {   Task
        {   description: description.into()
          , expected_output: expected_output.into()
          , agent
        }
    }

    /// Turns for this task, given the outputs of earlier tasks
    pub fn prompt(&self, context: &[TaskOutput]) -> Vec<Turn>
    {   let mut user = format!(
          "Current Task: {}\n\n\
           This is the expected criteria for your final answer: {}\n\
           You MUST return the actual complete content as the final \
           answer, not a summary.",
          self.description.trim(), self.expected_output.trim()
        );

        if !context.is_empty()
        {   let joined = context.iter()
              .map(|o| o.raw.as_str())
              .collect::<Vec<_>>()
              .join(CONTEXT_SEPARATOR);
            user.push_str(
              "\n\nThis is the context you're working with:\n"
            );
            user.push_str(&joined);
        }
        user.push_str("\n\nBegin!");

        vec![
          Turn::system(self.agent.system_prompt())
        , Turn::user(user)
        ]
    }
}

/// How tasks are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process
{   /// One task at a time, in declaration order
    Sequential
}

/// Result of one finished task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput
{   pub description: String
  , pub agent: String
  , pub raw: String
}

/// Result of a whole crew run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewOutput
{   /// Output of the last task
    pub raw: String
  , pub tasks_output: Vec<TaskOutput>
}

impl fmt::Display for CrewOutput
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(&self.raw)
    }
}

/// An ordered set of agents and tasks
#[derive(Debug, Clone)]
pub struct Crew
{   pub agents: Vec<Agent>
  , pub tasks: Vec<Task>
  , pub process: Process
  , pub options: CallOptions
}

impl Crew
{   pub fn new(
      agents: Vec<Agent>
    , tasks: Vec<Task>
    , process: Process
    ) -> Self
    {   Crew
        {   agents
          , tasks
          , process
          , options: CallOptions::new()
        }
    }

    /// Generation options passed on every model call
    pub fn with_options(mut self, options: CallOptions) -> Self
    {   self.options = options;
        self
    }

    fn validate(&self) -> Result<(), Error>
    {   if self.tasks.is_empty()
        {   return Err(Error::InvalidConfiguration(
              "crew has no tasks".to_string()
            ));
        }
        for task in &self.tasks
        {   if !self.agents.iter().any(|a| a.role == task.agent.role)
            {   return Err(Error::InvalidConfiguration(format!(
                  "task agent '{}' is not a crew member",
                  task.agent.role
                )));
            }
        }
        Ok(())
    }

    /// Run every task and return the final output.
    ///
    /// The first failing task stops the run; its error is returned as-is.
    pub async fn kickoff<L>(&self, llm: &L) -> Result<CrewOutput, Error>
    where
      L: LanguageModel + ?Sized
    {   self.validate().map_err(|e| {
          error!("Crew configuration rejected: {}", e);
          e
        })?;

        match self.process
        {   Process::Sequential => self.run_sequential(llm).await
        }
    }

    async fn run_sequential<L>(&self, llm: &L)
      -> Result<CrewOutput, Error>
    where
      L: LanguageModel + ?Sized
    {   debug!("Running {} tasks sequentially", self.tasks.len());
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(
          self.tasks.len()
        );

        for (index, task) in self.tasks.iter().enumerate()
        {   let agent = &task.agent;
            if agent.verbose
            {   info!(
                  "[{}/{}] Agent: {}",
                  index + 1, self.tasks.len(), agent.role
                );
                info!("Task: {}", task.description.trim());
            }

            let turns = task.prompt(&outputs);
            let raw = llm
              .call(Prompt::Turns(turns), None, &self.options)
              .await
              .map_err(|e| {
                error!("Task {} ({}) failed: {}", index + 1, agent.role, e);
                e
              })?;

            if agent.verbose
            {   info!("Agent: {}\nFinal Answer:\n{}", agent.role, raw);
            }

            outputs.push(TaskOutput
            {   description: task.description.clone()
              , agent: agent.role.clone()
              , raw
            });
        }

        let raw = outputs.last()
          .map(|o| o.raw.clone())
          .unwrap_or_default();
        Ok(CrewOutput
        {   raw
          , tasks_output: outputs
        })
    }
}
