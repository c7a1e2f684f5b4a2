// Roster Partitioner
// Groups a flat client roster into per-stage sequences ordered by position.

use std::collections::HashMap;

use crate::board::types::{Client, ClientId, Placement};
use crate::stages::{StageId, StageRegistry};

/// Per-stage view of the roster, in registry order.
///
/// Every input client appears in exactly one stage sequence. Empty stages are
/// kept so they still render as columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    columns: Vec<(StageId, Vec<Client>)>,
}

impl Partition {
    pub fn empty(registry: &StageRegistry) -> Self {
        Self {
            columns: registry.ids().map(|id| (id, Vec::new())).collect(),
        }
    }

    /// Group `clients` by effective stage and sort each stage by effective
    /// position. The sort is stable, so clients sharing a position keep their
    /// input order.
    pub fn build<I>(clients: I, registry: &StageRegistry) -> Self
    where
        I: IntoIterator<Item = Client>,
    {
        let fallback = registry.first();
        let mut grouped: HashMap<StageId, Vec<Client>> = HashMap::new();
        for client in clients {
            grouped
                .entry(client.stage.unwrap_or(fallback))
                .or_default()
                .push(client);
        }

        let columns = registry
            .ids()
            .map(|id| {
                let mut column = grouped.remove(&id).unwrap_or_default();
                column.sort_by_key(|client| client.position.unwrap_or(0));
                (id, column)
            })
            .collect();

        Self { columns }
    }

    pub fn stage(&self, stage: StageId) -> &[Client] {
        self.columns
            .iter()
            .find(|(id, _)| *id == stage)
            .map(|(_, column)| column.as_slice())
            .unwrap_or(&[])
    }

    /// Client ids of one stage in rendered order
    pub fn ids(&self, stage: StageId) -> Vec<ClientId> {
        self.stage(stage).iter().map(|client| client.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, &[Client])> {
        self.columns
            .iter()
            .map(|(id, column)| (*id, column.as_slice()))
    }

    pub fn locate(&self, client_id: ClientId) -> Option<(StageId, usize)> {
        self.columns.iter().find_map(|(id, column)| {
            column
                .iter()
                .position(|client| client.id == client_id)
                .map(|index| (*id, index))
        })
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.locate(client_id).is_some()
    }

    pub fn counts(&self) -> Vec<(StageId, usize)> {
        self.columns
            .iter()
            .map(|(id, column)| (*id, column.len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(|(_, column)| column.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move a client to `placement.stage`, inserting at `placement.index`
    /// clamped to the destination length after removal. Returns the placement
    /// actually applied, or `None` if the client is not in the partition.
    ///
    /// Only the moved client's record is touched; positions of other clients
    /// are left as the service last reported them.
    pub fn apply_placement(&mut self, placement: &Placement) -> Option<Placement> {
        let (from_stage, from_index) = self.locate(placement.client_id)?;
        if !self.columns.iter().any(|(id, _)| *id == placement.stage) {
            return None;
        }
        let mut client = self.column_mut(from_stage)?.remove(from_index);

        let column = self.column_mut(placement.stage)?;
        let index = placement.index.min(column.len());
        client.stage = Some(placement.stage);
        client.position = u32::try_from(index).ok();
        column.insert(index, client);

        Some(Placement {
            client_id: placement.client_id,
            stage: placement.stage,
            index,
        })
    }

    fn column_mut(&mut self, stage: StageId) -> Option<&mut Vec<Client>> {
        self.columns
            .iter_mut()
            .find(|(id, _)| *id == stage)
            .map(|(_, column)| column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StageRegistry {
        StageRegistry::default()
    }

    #[test]
    fn test_empty_roster_renders_every_stage() {
        let partition = Partition::build(Vec::new(), &registry());
        assert!(partition.is_empty());
        assert_eq!(partition.counts().len(), 6);
        assert!(partition.counts().iter().all(|(_, count)| *count == 0));
    }

    #[test]
    fn test_groups_by_stage_and_sorts_by_position() {
        let clients = vec![
            Client::new(1, "a").with_stage(StageId::Lead, 2),
            Client::new(2, "b").with_stage(StageId::Proposta, 0),
            Client::new(3, "c").with_stage(StageId::Lead, 0),
            Client::new(4, "d").with_stage(StageId::Lead, 1),
        ];
        let partition = Partition::build(clients, &registry());

        assert_eq!(partition.ids(StageId::Lead), vec![3, 4, 1]);
        assert_eq!(partition.ids(StageId::Proposta), vec![2]);
        assert_eq!(partition.len(), 4);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let clients = vec![
            Client::new(10, "x").with_stage(StageId::Negociacao, 1),
            Client::new(11, "y").with_stage(StageId::Negociacao, 1),
            Client::new(12, "z").with_stage(StageId::Negociacao, 0),
        ];
        let partition = Partition::build(clients, &registry());
        assert_eq!(partition.ids(StageId::Negociacao), vec![12, 10, 11]);
    }

    #[test]
    fn test_columns_follow_registry_order_with_every_client_placed() {
        let clients: Vec<Client> = StageId::ALL
            .iter()
            .rev()
            .enumerate()
            .map(|(index, stage)| Client::new(index as i64, "c").with_stage(*stage, 0))
            .chain(std::iter::once(Client::new(99, "unassigned")))
            .collect();
        let partition = Partition::build(clients, &registry());

        let order: Vec<StageId> = partition.iter().map(|(stage, _)| stage).collect();
        assert_eq!(order, StageId::ALL.to_vec());
        assert_eq!(partition.len(), 7);
        assert_eq!(partition.ids(StageId::Lead), vec![5, 99]);
        assert_eq!(partition.ids(StageId::Perdido), vec![0]);
    }

    #[test]
    fn test_unassigned_clients_land_in_first_stage_at_position_zero() {
        let clients = vec![
            Client::new(1, "assigned").with_stage(StageId::Lead, 1),
            Client::new(2, "unassigned"),
        ];
        let partition = Partition::build(clients, &registry());
        assert_eq!(partition.ids(StageId::Lead), vec![2, 1]);
    }

    #[test]
    fn test_apply_placement_clamps_index() {
        let clients = vec![
            Client::new(1, "a").with_stage(StageId::Lead, 0),
            Client::new(2, "b").with_stage(StageId::Lead, 1),
            Client::new(3, "c").with_stage(StageId::Fechado, 0),
        ];
        let mut partition = Partition::build(clients, &registry());

        let applied = partition
            .apply_placement(&Placement {
                client_id: 1,
                stage: StageId::Fechado,
                index: 40,
            })
            .unwrap();

        assert_eq!(applied.index, 1);
        assert_eq!(partition.ids(StageId::Lead), vec![2]);
        assert_eq!(partition.ids(StageId::Fechado), vec![3, 1]);
        assert_eq!(partition.locate(1), Some((StageId::Fechado, 1)));
    }

    #[test]
    fn test_apply_placement_within_same_stage() {
        let clients = vec![
            Client::new(1, "a").with_stage(StageId::Lead, 0),
            Client::new(2, "b").with_stage(StageId::Lead, 1),
            Client::new(3, "c").with_stage(StageId::Lead, 2),
        ];
        let mut partition = Partition::build(clients, &registry());

        partition.apply_placement(&Placement {
            client_id: 3,
            stage: StageId::Lead,
            index: 0,
        });

        assert_eq!(partition.ids(StageId::Lead), vec![3, 1, 2]);
    }

    #[test]
    fn test_apply_placement_for_missing_client_is_noop() {
        let clients = vec![Client::new(1, "a").with_stage(StageId::Lead, 0)];
        let mut partition = Partition::build(clients, &registry());
        let before = partition.clone();

        let applied = partition.apply_placement(&Placement {
            client_id: 99,
            stage: StageId::Lead,
            index: 0,
        });

        assert!(applied.is_none());
        assert_eq!(partition, before);
    }
}
