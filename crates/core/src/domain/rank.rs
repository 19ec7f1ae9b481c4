use std::collections::HashMap;

use super::DocId;

/// Orders `rows` by the position of their id in `ranked_ids`.
///
/// Rows whose id is not in the ranking are dropped. When an id repeats in the
/// ranking its first position wins.
pub fn rerank_by_ids<T, K>(ranked_ids: &[DocId], rows: Vec<T>, key: K) -> Vec<T>
where
    K: Fn(&T) -> DocId,
{
    let mut rank: HashMap<DocId, usize> = HashMap::with_capacity(ranked_ids.len());
    for (position, id) in ranked_ids.iter().enumerate() {
        rank.entry(*id).or_insert(position);
    }

    let mut ranked: Vec<(usize, T)> = rows
        .into_iter()
        .filter_map(|row| rank.get(&key(&row)).map(|position| (*position, row)))
        .collect();
    ranked.sort_by_key(|(position, _)| *position);

    ranked.into_iter().map(|(_, row)| row).collect()
}
