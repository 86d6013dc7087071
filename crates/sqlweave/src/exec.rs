//! Execution helpers: run a statement on a [`GenericClient`].

use crate::client::GenericClient;
use crate::error::WeaveResult;
use crate::scan::scan_row;
use crate::stmt::Stmt;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

impl Stmt {
    fn trace_exec(&self, params: &[&(dyn ToSql + Sync)]) {
        tracing::debug!(
            target: "sqlweave.sql",
            sql = %self.sql(),
            param_count = params.len(),
            dest_count = self.dest().len(),
            "executing statement"
        );
    }

    /// Run the statement and call `handler` once per row, after the row has
    /// been scanned into the statement's targets.
    ///
    /// ```ignore
    /// let id = Slot::<i64>::new();
    /// let mut ids = Vec::new();
    /// sqlweave::from("users", ()).select("id", ()).to(&id)
    ///     .query(&client, |_| ids.extend(id.take()))
    ///     .await?;
    /// ```
    pub async fn query<C, F>(&self, conn: &C, mut handler: F) -> WeaveResult<()>
    where
        C: GenericClient,
        F: FnMut(&Row),
    {
        let params = self.params_ref();
        self.trace_exec(&params);
        let rows = conn.query(self.sql(), &params).await?;
        for row in &rows {
            scan_row(row, self.dest())?;
            handler(row);
        }
        Ok(())
    }

    /// Run the statement and scan its first row into the targets.
    ///
    /// Returns [`WeaveError::NotFound`](crate::WeaveError::NotFound) when no
    /// row comes back.
    pub async fn query_row<C: GenericClient>(&self, conn: &C) -> WeaveResult<()> {
        let params = self.params_ref();
        self.trace_exec(&params);
        let row = conn.query_one(self.sql(), &params).await?;
        scan_row(&row, self.dest())
    }

    /// Run the statement and return all rows without scanning them.
    pub async fn fetch_all<C: GenericClient>(&self, conn: &C) -> WeaveResult<Vec<Row>> {
        let params = self.params_ref();
        self.trace_exec(&params);
        conn.query(self.sql(), &params).await
    }

    /// Run the statement and return the number of affected rows.
    pub async fn exec<C: GenericClient>(&self, conn: &C) -> WeaveResult<u64> {
        let params = self.params_ref();
        self.trace_exec(&params);
        conn.execute(self.sql(), &params).await
    }

    /// [`Stmt::query`], then return the statement to its pool.
    pub async fn query_and_close<C, F>(self, conn: &C, handler: F) -> WeaveResult<()>
    where
        C: GenericClient,
        F: FnMut(&Row),
    {
        let result = self.query(conn, handler).await;
        self.close();
        result
    }

    /// [`Stmt::query_row`], then return the statement to its pool.
    pub async fn query_row_and_close<C: GenericClient>(self, conn: &C) -> WeaveResult<()> {
        let result = self.query_row(conn).await;
        self.close();
        result
    }

    /// [`Stmt::exec`], then return the statement to its pool.
    pub async fn exec_and_close<C: GenericClient>(self, conn: &C) -> WeaveResult<u64> {
        let result = self.exec(conn).await;
        self.close();
        result
    }
}
