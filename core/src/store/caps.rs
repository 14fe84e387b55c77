use super::IcfStore;
use crate::{
    error::IcfResult,
    types::{CapTier, Category},
};
use rusqlite::params;

impl IcfStore {

pub fn upsert_cap_tier(&self, tier: &CapTier) -> IcfResult<()> {
    self.conn.execute(
        "INSERT INTO cap_tier (category, cap_label, cap_percent) VALUES (?1, ?2, ?3)
         ON CONFLICT(category) DO UPDATE SET
             cap_label = excluded.cap_label,
             cap_percent = excluded.cap_percent",
        params![tier.category.label(), tier.cap_label, tier.cap_percent],
    )?;
    Ok(())
}

pub fn cap_tiers(&self) -> IcfResult<Vec<CapTier>> {
    let mut stmt = self.conn.prepare(
        "SELECT category, cap_label, cap_percent FROM cap_tier ORDER BY category ASC",
    )?;
    let raw = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<f64>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut tiers = raw
        .into_iter()
        .map(|(category, cap_label, cap_percent)| {
            Ok(CapTier {
                category: category.parse::<Category>()?,
                cap_label,
                cap_percent,
            })
        })
        .collect::<IcfResult<Vec<_>>>()?;
    tiers.sort_by_key(|t| t.category);
    Ok(tiers)
}

}
