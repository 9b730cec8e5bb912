use super::{coords::XyPair, Arch};

fn manhattan(a: XyPair, b: XyPair) -> usize {
    a.x.abs_diff(b.x) as usize + a.y.abs_diff(b.y) as usize
}

/// Pairs every worker with the DRAM core it should report performance data through: the
/// closest DRAM core that sits at or before it on both axes, or the first DRAM core when
/// none does.
///
/// `channels` holds the live DRAM channels in logical order. Wormhole only exposes the
/// first port of each channel to this mapping.
pub(crate) fn map_workers_to_dram_banks(
    arch: Arch,
    workers: &[XyPair],
    channels: &[Vec<XyPair>],
) -> Vec<(XyPair, Vec<XyPair>)> {
    let banks: Vec<XyPair> = match arch {
        Arch::Wormhole => channels
            .iter()
            .filter_map(|channel| channel.first().copied())
            .collect(),
        Arch::Grayskull | Arch::Blackhole => channels.iter().flatten().copied().collect(),
    };

    let Some(first) = banks.first().copied() else {
        return Vec::new();
    };

    let mut assigned: Vec<Vec<XyPair>> = vec![Vec::new(); banks.len()];
    for worker in workers.iter().copied() {
        let mut target = 0;
        let mut target_core = first;

        for (index, bank) in banks.iter().copied().enumerate() {
            if worker.x < bank.x || worker.y < bank.y {
                continue;
            }

            let target_ahead = target_core.x > worker.x || target_core.y > worker.y;
            if target_ahead || manhattan(worker, bank) < manhattan(worker, target_core) {
                target = index;
                target_core = bank;
            }
        }

        assigned[target].push(worker);
    }

    banks
        .into_iter()
        .zip(assigned)
        .filter(|(_, workers)| !workers.is_empty())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn xy(x: u8, y: u8) -> XyPair {
        XyPair::new(x, y)
    }

    #[test]
    fn picks_nearest_bank_behind_worker() {
        let channels = vec![vec![xy(0, 0)], vec![xy(5, 0)], vec![xy(0, 6)]];
        let workers = vec![xy(1, 1), xy(6, 1), xy(1, 7), xy(6, 7)];

        let map = map_workers_to_dram_banks(Arch::Grayskull, &workers, &channels);
        assert_eq!(
            map,
            vec![
                (xy(0, 0), vec![xy(1, 1)]),
                (xy(5, 0), vec![xy(6, 1)]),
                (xy(0, 6), vec![xy(1, 7), xy(6, 7)]),
            ]
        );
    }

    #[test]
    fn worker_before_every_bank_falls_back_to_first() {
        let channels = vec![vec![xy(3, 3)], vec![xy(5, 5)]];
        let map = map_workers_to_dram_banks(Arch::Blackhole, &[xy(1, 1)], &channels);
        assert_eq!(map, vec![(xy(3, 3), vec![xy(1, 1)])]);
    }

    #[test]
    fn wormhole_uses_first_port_only() {
        let channels = vec![vec![xy(0, 0), xy(0, 5)], vec![xy(5, 0), xy(5, 5)]];
        let map = map_workers_to_dram_banks(Arch::Wormhole, &[xy(1, 6), xy(6, 6)], &channels);
        assert_eq!(
            map,
            vec![(xy(0, 0), vec![xy(1, 6)]), (xy(5, 0), vec![xy(6, 6)])]
        );
    }
}
