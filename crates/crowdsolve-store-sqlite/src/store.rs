//! [`SqliteStore`], the SQLite implementation of [`CommunityStore`].
//!
//! Every operation runs as a single closure on the `tokio_rusqlite`
//! connection thread, so read-modify-write sequences on one solution are
//! serialised without any extra locking. Multi-row writes additionally run
//! inside a transaction.

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use crowdsolve_core::{
  problem::{
    NewProblem, Problem, ProblemDetail, ProblemFilter, ProblemPatch, ProblemView,
    is_owner,
  },
  solution::{NewSolution, Solution, SolutionView, UpvoteOutcome},
  store::CommunityStore,
  user::{NewUser, User, normalize_email},
};

use crate::{
  Error, Result,
  encode::{
    PROBLEM_COLUMNS, RawProblem, RawSolution, RawUser, SOLUTION_COLUMNS,
    USER_COLUMNS, encode_comments, encode_dt, encode_upvotes, encode_uuid,
  },
  schema::SCHEMA,
};

type CoreError = crowdsolve_core::Error;

/// The current time at the precision timestamps are stored with, so values
/// returned from a write compare equal to the same values read back.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A CrowdSolve store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::info!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Execute raw SQL against the underlying connection.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self.with_conn(move |conn| Ok(conn.execute_batch(sql)?)).await
  }

  /// Run `f` on the connection thread. Domain errors raised inside `f` are
  /// carried back unchanged; only connection failures become
  /// [`Error::Database`].
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── Row access ──────────────────────────────────────────────────────────────

fn load_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
  let raw = conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawUser::from_row,
    )
    .optional()?;
  raw.map(RawUser::into_user).transpose()
}

/// Resolve a set of user ids into a directory for read-model expansion.
/// Unknown ids are simply absent from the result.
fn load_users(
  conn: &Connection,
  ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, User>> {
  let mut users = HashMap::new();
  for id in ids {
    if users.contains_key(&id) {
      continue;
    }
    if let Some(user) = load_user(conn, id)? {
      users.insert(id, user);
    }
  }
  Ok(users)
}

fn require_user(conn: &Connection, id: Uuid) -> Result<()> {
  match load_user(conn, id)? {
    Some(_) => Ok(()),
    None => Err(CoreError::UserNotFound(id).into()),
  }
}

fn load_problem(conn: &Connection, id: Uuid) -> Result<Option<Problem>> {
  let raw = conn
    .query_row(
      &format!("SELECT {PROBLEM_COLUMNS} FROM problems WHERE problem_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawProblem::from_row,
    )
    .optional()?;
  raw.map(RawProblem::into_problem).transpose()
}

fn load_solution(conn: &Connection, id: Uuid) -> Result<Option<Solution>> {
  let raw = conn
    .query_row(
      &format!("SELECT {SOLUTION_COLUMNS} FROM solutions WHERE solution_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawSolution::from_row,
    )
    .optional()?;
  raw.map(RawSolution::into_solution).transpose()
}

fn insert_problem(conn: &Connection, problem: &Problem) -> Result<()> {
  conn.execute(
    "INSERT INTO problems (
       problem_id, title, description, location, image, owner_id,
       status, solutions_count, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    rusqlite::params![
      encode_uuid(problem.problem_id),
      problem.title,
      problem.description,
      problem.location,
      problem.image,
      encode_uuid(problem.owner_id),
      problem.status.as_str(),
      problem.solutions_count,
      encode_dt(problem.created_at),
      encode_dt(problem.updated_at),
    ],
  )?;
  Ok(())
}

fn insert_solution(conn: &Connection, solution: &Solution) -> Result<()> {
  conn.execute(
    "INSERT INTO solutions (
       solution_id, problem_id, author_id, description,
       upvotes, upvote_count, comments, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      encode_uuid(solution.solution_id()),
      encode_uuid(solution.problem_id()),
      encode_uuid(solution.author_id()),
      solution.description(),
      encode_upvotes(solution)?,
      solution.upvote_count(),
      encode_comments(solution.comments())?,
      encode_dt(solution.created_at()),
      encode_dt(solution.updated_at()),
    ],
  )?;
  Ok(())
}

/// Persist the mutable half of a solution document. The upvote set and its
/// count are always written together.
fn write_solution_state(conn: &Connection, solution: &Solution) -> Result<()> {
  conn.execute(
    "UPDATE solutions
        SET upvotes = ?2, upvote_count = ?3, comments = ?4, updated_at = ?5
      WHERE solution_id = ?1",
    rusqlite::params![
      encode_uuid(solution.solution_id()),
      encode_upvotes(solution)?,
      solution.upvote_count(),
      encode_comments(solution.comments())?,
      encode_dt(solution.updated_at()),
    ],
  )?;
  Ok(())
}

fn problem_view(conn: &Connection, problem: Problem) -> Result<ProblemView> {
  let owner = load_user(conn, problem.owner_id)?.map(|u| u.profile());
  Ok(ProblemView { problem, owner })
}

fn solution_view(conn: &Connection, solution: &Solution) -> Result<SolutionView> {
  let users = load_users(conn, solution.referenced_users())?;
  Ok(SolutionView::assemble(solution, &users))
}

/// Load a problem and enforce the owner gate.
fn owned_problem(conn: &Connection, id: Uuid, caller_id: Uuid) -> Result<Problem> {
  let problem = load_problem(conn, id)?.ok_or(CoreError::ProblemNotFound(id))?;
  if !is_owner(&problem, caller_id) {
    return Err(CoreError::NotOwner { problem: id, caller: caller_id }.into());
  }
  Ok(problem)
}

// ─── CommunityStore impl ─────────────────────────────────────────────────────

impl CommunityStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:    Uuid::new_v4(),
      name:       input.name,
      email:      input.email,
      avatar:     input.avatar,
      created_at: now(),
    };
    let password_hash = input.password_hash;

    self
      .with_conn(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![user.email],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Err(CoreError::EmailTaken(user.email).into());
        }

        conn.execute(
          "INSERT INTO users (user_id, name, email, avatar, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            encode_uuid(user.user_id),
            user.name,
            user.email,
            user.avatar,
            password_hash,
            encode_dt(user.created_at),
          ],
        )?;
        Ok(user)
      })
      .await
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.with_conn(move |conn| load_user(conn, id)).await
  }

  async fn find_credentials(&self, email: &str) -> Result<Option<(User, String)>> {
    let email = normalize_email(email);

    self
      .with_conn(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
            ),
            rusqlite::params![email],
            |row| Ok((RawUser::from_row(row)?, row.get::<_, String>(5)?)),
          )
          .optional()?;

        raw
          .map(|(raw, hash)| Ok::<_, Error>((raw.into_user()?, hash)))
          .transpose()
      })
      .await
  }

  // ── Problems ──────────────────────────────────────────────────────────────

  async fn create_problem(
    &self,
    input: NewProblem,
    owner_id: Uuid,
  ) -> Result<ProblemView> {
    let problem = Problem::new(input, owner_id, now());

    self
      .with_conn(move |conn| {
        require_user(conn, owner_id)?;
        insert_problem(conn, &problem)?;
        problem_view(conn, problem)
      })
      .await
  }

  async fn list_problems(&self, filter: &ProblemFilter) -> Result<Vec<ProblemView>> {
    let filter = filter.clone();

    self
      .with_conn(move |conn| {
        let status = filter.status.map(|s| s.as_str());
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROBLEM_COLUMNS} FROM problems
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY created_at DESC, rowid DESC"
        ))?;
        let raws = stmt
          .query_map(rusqlite::params![status], RawProblem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut problems = Vec::with_capacity(raws.len());
        for raw in raws {
          let problem = raw.into_problem()?;
          if filter.matches(&problem) {
            problems.push(problem);
          }
        }

        let owners = load_users(conn, problems.iter().map(|p| p.owner_id))?;
        Ok(
          problems
            .into_iter()
            .map(|problem| {
              let owner = owners.get(&problem.owner_id).map(User::profile);
              ProblemView { problem, owner }
            })
            .collect(),
        )
      })
      .await
  }

  async fn get_problem(&self, id: Uuid) -> Result<ProblemDetail> {
    self
      .with_conn(move |conn| {
        let problem = load_problem(conn, id)?.ok_or(CoreError::ProblemNotFound(id))?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {SOLUTION_COLUMNS} FROM solutions
            WHERE problem_id = ?1
            ORDER BY upvote_count DESC, created_at ASC, rowid ASC"
        ))?;
        let solutions = stmt
          .query_map(rusqlite::params![encode_uuid(id)], RawSolution::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?
          .into_iter()
          .map(RawSolution::into_solution)
          .collect::<Result<Vec<_>>>()?;

        let users = load_users(
          conn,
          std::iter::once(problem.owner_id)
            .chain(solutions.iter().flat_map(Solution::referenced_users)),
        )?;

        let owner = users.get(&problem.owner_id).map(User::profile);
        Ok(ProblemDetail {
          problem:   ProblemView { problem, owner },
          solutions: solutions
            .iter()
            .map(|s| SolutionView::assemble(s, &users))
            .collect(),
        })
      })
      .await
  }

  async fn update_problem(
    &self,
    id: Uuid,
    caller_id: Uuid,
    patch: ProblemPatch,
  ) -> Result<ProblemView> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let current = owned_problem(&tx, id, caller_id)?;
        let next = patch.apply(&current, now())?;

        tx.execute(
          "UPDATE problems
              SET title = ?2, description = ?3, location = ?4,
                  image = ?5, status = ?6, updated_at = ?7
            WHERE problem_id = ?1",
          rusqlite::params![
            encode_uuid(id),
            next.title,
            next.description,
            next.location,
            next.image,
            next.status.as_str(),
            encode_dt(next.updated_at),
          ],
        )?;
        tx.commit()?;

        problem_view(conn, next)
      })
      .await
  }

  async fn delete_problem(&self, id: Uuid, caller_id: Uuid) -> Result<()> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        owned_problem(&tx, id, caller_id)?;

        let id_str = encode_uuid(id);
        let removed = tx.execute(
          "DELETE FROM solutions WHERE problem_id = ?1",
          rusqlite::params![id_str],
        )?;

        const COMMITTED: &str = "deleting solutions";
        const STEP: &str = "deleting problem";
        let deleted = tx
          .execute("DELETE FROM problems WHERE problem_id = ?1", rusqlite::params![id_str])
          .map_err(|e| Error::partial(COMMITTED, STEP, e))?;
        if deleted != 1 {
          return Err(Error::partial(
            COMMITTED,
            STEP,
            format!("expected 1 problem row, deleted {deleted}"),
          ));
        }

        tx.commit()?;
        tracing::debug!(problem_id = %id, solutions = removed, "deleted problem");
        Ok(())
      })
      .await
  }

  // ── Solutions ─────────────────────────────────────────────────────────────

  async fn create_solution(
    &self,
    input: NewSolution,
    author_id: Uuid,
  ) -> Result<SolutionView> {
    let solution = Solution::new(input, author_id, now());

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let problem_id = solution.problem_id();
        if load_problem(&tx, problem_id)?.is_none() {
          return Err(CoreError::ProblemNotFound(problem_id).into());
        }
        require_user(&tx, author_id)?;

        insert_solution(&tx, &solution)?;

        const COMMITTED: &str = "inserting solution";
        const STEP: &str = "incrementing solutions_count";
        let bumped = tx
          .execute(
            "UPDATE problems
                SET solutions_count = solutions_count + 1, updated_at = ?2
              WHERE problem_id = ?1",
            rusqlite::params![
              encode_uuid(problem_id),
              encode_dt(solution.created_at()),
            ],
          )
          .map_err(|e| Error::partial(COMMITTED, STEP, e))?;
        if bumped != 1 {
          return Err(Error::partial(
            COMMITTED,
            STEP,
            format!("expected 1 problem row, updated {bumped}"),
          ));
        }

        tx.commit()?;
        solution_view(conn, &solution)
      })
      .await
  }

  async fn toggle_upvote(
    &self,
    solution_id: Uuid,
    user_id: Uuid,
  ) -> Result<UpvoteOutcome> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let mut solution = load_solution(&tx, solution_id)?
          .ok_or(CoreError::SolutionNotFound(solution_id))?;

        let outcome = solution.toggle_upvote(user_id, now());
        write_solution_state(&tx, &solution)?;
        tx.commit()?;
        Ok(outcome)
      })
      .await
  }

  async fn add_comment(
    &self,
    solution_id: Uuid,
    author_id: Uuid,
    text: String,
  ) -> Result<SolutionView> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let mut solution = load_solution(&tx, solution_id)?
          .ok_or(CoreError::SolutionNotFound(solution_id))?;

        solution.add_comment(author_id, &text, now())?;
        write_solution_state(&tx, &solution)?;
        tx.commit()?;

        solution_view(conn, &solution)
      })
      .await
  }
}
