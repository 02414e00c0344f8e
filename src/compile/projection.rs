//! The fixed SELECT projection (§4.4.3): every compiled screen returns
//! the same instrument-identity columns plus the latest price, so API
//! consumers get a stable result shape regardless of which fields the
//! filter touched.

use crate::catalog::TableRef;
use crate::compile::emitter::SqlEmitter;

/// Emit `SELECT i.ticker, md.sector, ..., price`.
pub fn emit_select(emitter: &mut SqlEmitter) {
    let ph = TableRef::PriceHistory.alias();
    emitter.raw(format!(
        "SELECT {i}.ticker, {md}.sector, {md}.industry, {md}.exchange, {i}.market_cap, {ph}.price_display AS price ",
        i = TableRef::Instruments.alias(),
        md = TableRef::Metadata.alias(),
    ));
}

/// Emit the dedicated price-history lateral join under the fixed `ph`
/// alias: the latest row (all columns, so filter conditions on `price`
/// or `rsi` resolve against it normally), plus a `price_display` column
/// that falls back to the most recent *non-null* close if the latest
/// snapshot's close itself is null (§4.4.3 "COALESCE-latest-non-null
/// fallback"). Always joined, regardless of whether the filter touches
/// price history, since the fixed projection always reports a price.
pub fn emit_price_join(emitter: &mut SqlEmitter) {
    let table = TableRef::PriceHistory.table_name();
    let i = TableRef::Instruments.alias();
    let ph = TableRef::PriceHistory.alias();
    emitter.raw(format!(
        "LEFT JOIN LATERAL ( \
            SELECT latest.*, COALESCE(latest.close, ( \
                SELECT close FROM {table} WHERE ticker = {i}.ticker AND close IS NOT NULL ORDER BY time DESC LIMIT 1 \
            )) AS price_display \
            FROM (SELECT * FROM {table} WHERE ticker = {i}.ticker ORDER BY time DESC LIMIT 1) latest \
         ) {ph} ON true "
    ));
}
