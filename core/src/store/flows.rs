use super::IcfStore;
use crate::{
    error::IcfResult,
    types::{Category, TransactionFlow},
};
use rusqlite::params;

impl IcfStore {

pub fn insert_flow(&self, period: &str, flow: &TransactionFlow) -> IcfResult<()> {
    self.conn.execute(
        "INSERT INTO icf_flow (
             period, category, acquirer, issuer, value_of_transactions,
             reported_icf_rate, icf_paid, issuer_category_icf_share
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            period, flow.category.label(), flow.acquirer, flow.issuer,
            flow.value_of_transactions, flow.reported_icf_rate,
            flow.icf_paid, flow.issuer_category_icf_share,
        ],
    )?;
    Ok(())
}

/// Insert many rows in one transaction.
pub fn insert_flows(&mut self, period: &str, flows: &[TransactionFlow]) -> IcfResult<()> {
    let tx = self.conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO icf_flow (
                 period, category, acquirer, issuer, value_of_transactions,
                 reported_icf_rate, icf_paid, issuer_category_icf_share
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        )?;
        for flow in flows {
            stmt.execute(params![
                period, flow.category.label(), flow.acquirer, flow.issuer,
                flow.value_of_transactions, flow.reported_icf_rate,
                flow.icf_paid, flow.issuer_category_icf_share,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn flows_for_period(&self, period: &str) -> IcfResult<Vec<TransactionFlow>> {
    let mut stmt = self.conn.prepare(
        "SELECT category, acquirer, issuer, value_of_transactions,
                reported_icf_rate, icf_paid, issuer_category_icf_share
         FROM icf_flow WHERE period = ?1
         ORDER BY id ASC",
    )?;
    let raw = stmt
        .query_map(params![period], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, f64>(3)?,
                r.get::<_, f64>(4)?,
                r.get::<_, f64>(5)?,
                r.get::<_, f64>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(category, acquirer, issuer, value, rate, paid, share)| {
            Ok(TransactionFlow {
                category: category.parse::<Category>()?,
                acquirer,
                issuer,
                value_of_transactions: value,
                reported_icf_rate: rate,
                icf_paid: paid,
                issuer_category_icf_share: share,
            })
        })
        .collect()
}

pub fn flow_count(&self, period: &str) -> IcfResult<i64> {
    Ok(self.conn.query_row(
        "SELECT COUNT(*) FROM icf_flow WHERE period = ?1",
        params![period],
        |r| r.get(0),
    )?)
}

}
