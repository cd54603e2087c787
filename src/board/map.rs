//! The canonical map.
//!
//! Loaded once from the text assets embedded at compile time. Everything a
//! game needs to know about geography lives here: the land graph, the
//! coast-qualified sea graph, the bare graph derived from both, supply
//! centers, the opening position, and the sea basins used to decide when a
//! move might need a convoy.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use rayon::prelude::*;
use thiserror::Error;

use super::graph::{Graph, UNREACHABLE};
use super::territory::{Coast, Location, Nation, Territory, TerritoryKind, ALL_NATIONS};
use super::unit::UnitKind;

const LAND_GRAPH: &str = include_str!("../../assets/land_graph");
const SEA_GRAPH: &str = include_str!("../../assets/sea_graph");
const NAMES: &str = include_str!("../../assets/names");
const SUPPLY_CENTERS: &str = include_str!("../../assets/supply_centers");
const DEFAULT_UNITS: &str = include_str!("../../assets/default_units");

/// The map every session plays on.
pub static MAP: LazyLock<Map> = LazyLock::new(|| match Map::load() {
    Ok(map) => map,
    Err(e) => panic!("embedded map is inconsistent: {e}"),
});

/// Errors found while loading map assets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("{asset}:{line}: expected 'name: values'")]
    MissingColon { asset: &'static str, line: usize },

    #[error("{asset}: unknown territory '{name}'")]
    UnknownTerritory { asset: &'static str, name: String },

    #[error("{asset}: unknown coast '{coast}'")]
    UnknownCoast { asset: &'static str, coast: String },

    #[error("supply_centers: unknown nation '{0}'")]
    UnknownNation(String),

    #[error("default_units:{line}: malformed unit '{text}'")]
    MalformedUnit { line: usize, text: String },

    #[error("too many territories ({0})")]
    TooManyTerritories(usize),
}

/// A unit of the opening position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartingUnit {
    pub territory: Territory,
    pub kind: UnitKind,
    pub coast: Option<Coast>,
}

#[derive(Debug)]
pub struct Map {
    pub(crate) names: Vec<String>,
    pub(crate) full_names: Vec<Option<String>>,
    pub(crate) kinds: Vec<TerritoryKind>,
    pub(crate) coasts: Vec<Vec<Coast>>,
    pub(crate) supply_centers: BTreeSet<Territory>,
    home_centers: [BTreeSet<Territory>; 7],
    lookup: HashMap<String, Territory>,

    /// Army movement.
    pub land: Graph<Territory>,
    /// Fleet movement; split-coast territories appear once per coast.
    pub sea: Graph<Location>,
    /// Land and sea edges with coasts stripped.
    pub bare: Graph<Territory>,

    basins: Vec<BTreeSet<Territory>>,
    coastal_clusters: Vec<BTreeSet<Territory>>,
    distances: Vec<Vec<u32>>,
    starting_units: Vec<StartingUnit>,
}

/// Splits `Name: a b c` lines, skipping blanks.
fn entries(
    asset: &'static str,
    text: &'static str,
) -> Result<Vec<(&'static str, Vec<&'static str>)>, MapError> {
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (head, rest) = line
            .split_once(':')
            .ok_or(MapError::MissingColon { asset, line: i + 1 })?;
        out.push((head.trim(), rest.split_whitespace().collect()));
    }
    Ok(out)
}

/// Splits `Spa(NC)` into `("Spa", Some("(NC)"))`.
fn split_qualified(s: &str) -> (&str, Option<&str>) {
    match s.find('(') {
        Some(i) => (&s[..i], Some(&s[i..])),
        None => (s, None),
    }
}

impl Map {
    fn load() -> Result<Map, MapError> {
        let land_entries = entries("land_graph", LAND_GRAPH)?;
        let sea_entries = entries("sea_graph", SEA_GRAPH)?;

        // Territory indices follow case-insensitive name order.
        let mut bare: BTreeMap<String, &'static str> = BTreeMap::new();
        for (head, rest) in land_entries.iter().chain(&sea_entries) {
            for name in std::iter::once(head).chain(rest) {
                let (name, _) = split_qualified(*name);
                bare.entry(name.to_lowercase()).or_insert(name);
            }
        }
        if bare.len() > u8::MAX as usize {
            return Err(MapError::TooManyTerritories(bare.len()));
        }
        let names: Vec<String> = bare.values().map(|s| s.to_string()).collect();
        let index: HashMap<String, Territory> = bare
            .keys()
            .enumerate()
            .map(|(i, k)| (k.clone(), Territory::from_index(i)))
            .collect();

        let territory = |asset: &'static str, name: &str| {
            index
                .get(&name.to_lowercase())
                .copied()
                .ok_or_else(|| MapError::UnknownTerritory {
                    asset,
                    name: name.to_string(),
                })
        };
        let location = |asset: &'static str, name: &str| -> Result<Location, MapError> {
            let (terr, coast) = split_qualified(name);
            let coast = match coast {
                Some(c) => Some(Coast::parse(c).ok_or_else(|| MapError::UnknownCoast {
                    asset,
                    coast: c.to_string(),
                })?),
                None => None,
            };
            Ok(territory(asset, terr)?.with_coast(coast))
        };

        let mut land = Graph::new();
        for (head, rest) in &land_entries {
            let from = territory("land_graph", head)?;
            land.add_vertex(from);
            for to in rest {
                land.add_edge(from, territory("land_graph", to)?);
            }
        }

        let mut sea = Graph::new();
        for (head, rest) in &sea_entries {
            let from = location("sea_graph", head)?;
            sea.add_vertex(from);
            for to in rest {
                sea.add_edge(from, location("sea_graph", to)?);
            }
        }

        let mut bare_graph = Graph::new();
        for t in land.vertices() {
            bare_graph.add_vertex(t);
        }
        for l in sea.vertices() {
            bare_graph.add_vertex(l.territory);
        }
        for (a, b) in land.edges() {
            bare_graph.add_edge(a, b);
        }
        for (a, b) in sea.edges() {
            bare_graph.add_edge(a.territory, b.territory);
        }

        let n = names.len();
        let mut coasts = vec![Vec::new(); n];
        let mut in_sea = vec![false; n];
        for l in sea.vertices() {
            in_sea[l.territory.index()] = true;
            if let Some(c) = l.coast {
                coasts[l.territory.index()].push(c);
            }
        }
        for cs in &mut coasts {
            cs.sort();
        }
        let kinds: Vec<TerritoryKind> = (0..n)
            .map(|i| {
                let t = Territory::from_index(i);
                match (land.contains(t), in_sea[i]) {
                    (true, true) => TerritoryKind::Coastal,
                    (false, _) => TerritoryKind::Sea,
                    (true, false) => TerritoryKind::Land,
                }
            })
            .collect();

        let mut full_names = vec![None; n];
        let mut lookup = index.clone();
        for (abbr, rest) in entries("names", NAMES)? {
            let t = territory("names", abbr)?;
            let full = rest.join(" ");
            lookup.insert(full.to_lowercase(), t);
            full_names[t.index()] = Some(full);
        }

        let mut supply_centers = BTreeSet::new();
        let mut home_centers: [BTreeSet<Territory>; 7] = Default::default();
        for (head, rest) in entries("supply_centers", SUPPLY_CENTERS)? {
            let centers = rest
                .iter()
                .map(|s| territory("supply_centers", s))
                .collect::<Result<BTreeSet<_>, _>>()?;
            supply_centers.extend(centers.iter().copied());
            if head.eq_ignore_ascii_case("neutral") {
                continue;
            }
            let nation =
                Nation::parse(head).ok_or_else(|| MapError::UnknownNation(head.to_string()))?;
            home_centers[nation.index()].extend(centers);
        }

        let mut starting_units = Vec::new();
        for (i, line) in DEFAULT_UNITS.lines().enumerate() {
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            let malformed = || MapError::MalformedUnit {
                line: i + 1,
                text: line.to_string(),
            };
            let (terr, kind, coast) = match words.as_slice() {
                [t, k] => (*t, *k, None),
                [t, k, c] => (*t, *k, Some(Coast::parse(c).ok_or_else(malformed)?)),
                _ => return Err(malformed()),
            };
            starting_units.push(StartingUnit {
                territory: territory("default_units", terr)?,
                kind: UnitKind::parse(kind).ok_or_else(malformed)?,
                coast,
            });
        }

        // Basins are the connected bodies of open sea; each basin's coastal
        // cluster is every shore it touches.
        let offshore = sea.subgraph(|l| kinds[l.territory.index()] == TerritoryKind::Sea);
        let mut basins = Vec::new();
        let mut coastal_clusters = Vec::new();
        for component in offshore.components() {
            let shore = sea.neighbors(component.iter().copied());
            basins.push(component.iter().map(|l| l.territory).collect());
            coastal_clusters.push(shore.iter().map(|l| l.territory).collect());
        }

        let distances: Vec<Vec<u32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let from = Territory::from_index(i);
                if !bare_graph.contains(from) {
                    return vec![UNREACHABLE; n];
                }
                let d = bare_graph.distances(from);
                (0..n)
                    .map(|j| {
                        d.get(&Territory::from_index(j))
                            .copied()
                            .unwrap_or(UNREACHABLE)
                    })
                    .collect()
            })
            .collect();

        Ok(Map {
            names,
            full_names,
            kinds,
            coasts,
            supply_centers,
            home_centers,
            lookup,
            land,
            sea,
            bare: bare_graph,
            basins,
            coastal_clusters,
            distances,
            starting_units,
        })
    }

    /// Number of territories.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub(crate) fn lookup(&self, s: &str) -> Option<Territory> {
        self.lookup.get(&s.trim().to_lowercase()).copied()
    }

    pub fn home_centers(&self, nation: Nation) -> &BTreeSet<Territory> {
        &self.home_centers[nation.index()]
    }

    pub fn supply_centers(&self) -> &BTreeSet<Territory> {
        &self.supply_centers
    }

    /// Hop count over the bare graph; [`UNREACHABLE`] when disconnected.
    pub fn distance(&self, from: Territory, to: Territory) -> u32 {
        self.distances[from.index()][to.index()]
    }

    /// Hop counts from `from` to every territory, indexed by territory.
    pub fn distances(&self, from: Territory) -> &[u32] {
        &self.distances[from.index()]
    }

    /// Shortest distance from `t` to any home center of `nation`.
    pub fn distance_from_home(&self, nation: Nation, t: Territory) -> u32 {
        self.home_centers(nation)
            .iter()
            .map(|h| self.distance(*h, t))
            .min()
            .unwrap_or(UNREACHABLE)
    }

    /// Connected bodies of open sea.
    pub fn basins(&self) -> &[BTreeSet<Territory>] {
        &self.basins
    }

    /// Whether some basin's shore contains both territories.
    pub fn share_coastal_cluster(&self, a: Territory, b: Territory) -> bool {
        self.coastal_clusters
            .iter()
            .any(|c| c.contains(&a) && c.contains(&b))
    }

    /// Sea-graph vertices of a territory: one per coast for split-coast
    /// territories, the bare territory otherwise, nothing for land.
    pub fn sea_locations(&self, t: Territory) -> Vec<Location> {
        match t.coasts() {
            [] if t.kind() == TerritoryKind::Land => Vec::new(),
            [] => vec![Location::new(t)],
            cs => cs.iter().map(|c| t.with_coast(Some(*c))).collect(),
        }
    }

    pub fn starting_units(&self) -> &[StartingUnit] {
        &self.starting_units
    }

    /// Every nation's home centers, in nation order.
    pub fn homes(&self) -> impl Iterator<Item = (Nation, &BTreeSet<Territory>)> {
        ALL_NATIONS
            .into_iter()
            .map(move |n| (n, self.home_centers(n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Territory {
        s.parse().unwrap()
    }

    fn loc(s: &str) -> Location {
        s.parse().unwrap()
    }

    #[test]
    fn standard_map_dimensions() {
        assert_eq!(MAP.len(), 75);
        assert_eq!(MAP.supply_centers().len(), 34);
        assert_eq!(MAP.starting_units().len(), 22);
        assert_eq!(MAP.home_centers(Nation::Russia).len(), 4);
    }

    #[test]
    fn neighbors_exclude_self_and_are_symmetric() {
        for a in MAP.land.vertices() {
            let ns = MAP.land.neighbors([a]);
            assert!(!ns.contains(&a));
            for b in ns {
                assert!(MAP.land.neighbors([b]).contains(&a), "{a} {b}");
            }
        }
        for a in MAP.sea.vertices() {
            for b in MAP.sea.neighbors([a]) {
                assert!(MAP.sea.neighbors([b]).contains(&a), "{a} {b}");
            }
        }
    }

    #[test]
    fn split_coasts_are_separate_sea_vertices() {
        let nc = MAP.sea.neighbors([loc("Spa(NC)")]);
        assert!(nc.contains(&loc("Gas")));
        assert!(!nc.contains(&loc("Wes")));
        let sc = MAP.sea.neighbors([loc("StP(SC)")]);
        assert!(sc.contains(&loc("Bot")));
        assert!(!MAP.sea.contains(loc("Spa")));
    }

    #[test]
    fn bare_distances() {
        assert_eq!(MAP.distance(t("Lon"), t("Lon")), 0);
        assert_eq!(MAP.distance(t("Lon"), t("Nth")), 1);
        assert_eq!(MAP.distance(t("Lon"), t("Bel")), 2);
        assert_eq!(MAP.distance(t("Par"), t("Mar")), 2);
        assert_eq!(MAP.distance_from_home(Nation::France, t("Bur")), 1);
    }

    #[test]
    fn three_basins() {
        let mut sizes: Vec<usize> = MAP.basins().iter().map(|b| b.len()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![1, 2, 16]);
        assert!(MAP.basins().iter().any(|b| b.contains(&t("Bla"))));
    }

    #[test]
    fn coastal_clusters() {
        assert!(MAP.share_coastal_cluster(t("Kie"), t("Ber")));
        assert!(MAP.share_coastal_cluster(t("Sev"), t("Rum")));
        assert!(MAP.share_coastal_cluster(t("Spa"), t("Mar")));
        assert!(!MAP.share_coastal_cluster(t("Mun"), t("Kie")));
        assert!(!MAP.share_coastal_cluster(t("Sev"), t("Kie")));
    }

    #[test]
    fn sea_locations_follow_kind() {
        assert!(MAP.sea_locations(t("Mun")).is_empty());
        assert_eq!(MAP.sea_locations(t("Nth")), vec![loc("Nth")]);
        assert_eq!(
            MAP.sea_locations(t("StP")),
            vec![loc("StP(NC)"), loc("StP(SC)")]
        );
    }

    #[test]
    fn full_names_resolve() {
        assert_eq!(t("Mid-Atlantic Ocean"), t("Mao"));
        assert_eq!(t("Mao").full_name(), "Mid-Atlantic Ocean");
    }
}
