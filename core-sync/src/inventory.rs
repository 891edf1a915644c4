//! # Song Inventory
//!
//! Merges the device inventory (persisted songs) with the cloud listing.
//!
//! The device copy of a song is authoritative: a cloud song whose
//! `remote_path` already appears on the device is discarded. The merged list
//! is sorted with [`Song::display_order`].
//!
//! [`Inventory`] holds the latest value of each source and only produces a
//! merged list once both have reported (combine-latest).

use core_library::{ActionState, Song};
use std::collections::HashSet;

/// Merge device and cloud songs, de-duplicating by `remote_path`.
pub fn merge_inventories(device: &[Song], cloud: &[Song]) -> Vec<Song> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(device.len() + cloud.len());
    let mut merged = Vec::with_capacity(device.len() + cloud.len());

    for song in device.iter().chain(cloud.iter()) {
        if seen.insert(song.remote_path.as_str()) {
            merged.push(song.clone());
        }
    }

    merged.sort_by(Song::display_order);
    merged
}

/// Latest device and cloud inventories plus their merged view.
#[derive(Debug, Default)]
pub struct Inventory {
    device: Option<Vec<Song>>,
    cloud: Option<Vec<Song>>,
    merged: Option<Vec<Song>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new device inventory. Returns the merged list when the cloud
    /// inventory has also been seen.
    pub fn set_device(&mut self, songs: Vec<Song>) -> Option<&[Song]> {
        self.device = Some(songs);
        self.remerge()
    }

    /// Record a new cloud inventory. Returns the merged list when the device
    /// inventory has also been seen.
    pub fn set_cloud(&mut self, songs: Vec<Song>) -> Option<&[Song]> {
        self.cloud = Some(songs);
        self.remerge()
    }

    pub fn merged(&self) -> Option<&[Song]> {
        self.merged.as_deref()
    }

    pub fn device_len(&self) -> usize {
        self.device.as_ref().map_or(0, Vec::len)
    }

    pub fn cloud_len(&self) -> usize {
        self.cloud.as_ref().map_or(0, Vec::len)
    }

    /// Current copy of a song, preferring the merged view.
    pub fn find(&self, remote_path: &str) -> Option<&Song> {
        [&self.merged, &self.device, &self.cloud]
            .into_iter()
            .flatten()
            .flat_map(|songs| songs.iter())
            .find(|song| song.remote_path == remote_path)
    }

    /// Set the state of every copy of a song.
    ///
    /// Returns the merged list when it changed, so the caller can republish.
    pub fn mark(&mut self, remote_path: &str, state: ActionState) -> Option<&[Song]> {
        for songs in [&mut self.device, &mut self.cloud].into_iter().flatten() {
            Self::mark_in(songs, remote_path, state);
        }

        let changed = match self.merged.as_mut() {
            Some(merged) => Self::mark_in(merged, remote_path, state),
            None => false,
        };

        if changed {
            self.merged()
        } else {
            None
        }
    }

    fn mark_in(songs: &mut [Song], remote_path: &str, state: ActionState) -> bool {
        let mut changed = false;
        for song in songs.iter_mut().filter(|s| s.remote_path == remote_path) {
            if song.state != state {
                song.state = state;
                changed = true;
            }
        }
        changed
    }

    fn remerge(&mut self) -> Option<&[Song]> {
        let (Some(device), Some(cloud)) = (&self.device, &self.cloud) else {
            return None;
        };
        self.merged = Some(merge_inventories(device, cloud));
        self.merged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(path: &str, name: &str) -> Song {
        Song::builder(path).name(name).build().unwrap()
    }

    fn paths(songs: &[Song]) -> Vec<&str> {
        songs.iter().map(|s| s.remote_path.as_str()).collect()
    }

    #[test]
    fn test_merge_prefers_device_copy() {
        let device = vec![song("/a.mp3", "A").with_state(ActionState::PendingToRemoval)];
        let cloud = vec![song("/a.mp3", "A"), song("/b.mp3", "B")];

        let merged = merge_inventories(&device, &cloud);

        assert_eq!(paths(&merged), vec!["/a.mp3", "/b.mp3"]);
        assert_eq!(merged[0].state, ActionState::PendingToRemoval);
    }

    #[test]
    fn test_merge_sorts_regardless_of_input_order() {
        let device = vec![song("/z.mp3", "zulu"), song("/m.mp3", "Mike")];
        let cloud = vec![song("/c.mp3", "charlie"), song("/a.mp3", "Alpha")];

        let merged = merge_inventories(&device, &cloud);
        let names: Vec<_> = merged.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(names, vec!["Alpha", "charlie", "Mike", "zulu"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let songs = vec![song("/b.mp3", "B"), song("/a.mp3", "A")];

        let once = merge_inventories(&songs, &songs);
        let twice = merge_inventories(&once, &once);

        assert_eq!(paths(&once), vec!["/a.mp3", "/b.mp3"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_empty_sources() {
        assert!(merge_inventories(&[], &[]).is_empty());
        assert_eq!(merge_inventories(&[], &[song("/a.mp3", "A")]).len(), 1);
    }

    #[test]
    fn test_inventory_waits_for_both_sources() {
        let mut inventory = Inventory::new();

        assert!(inventory.set_device(vec![song("/a.mp3", "A")]).is_none());
        assert!(inventory.merged().is_none());

        let merged = inventory.set_cloud(vec![song("/b.mp3", "B")]).unwrap();
        assert_eq!(paths(merged), vec!["/a.mp3", "/b.mp3"]);
    }

    #[test]
    fn test_inventory_reemission_uses_latest_other_source() {
        let mut inventory = Inventory::new();
        inventory.set_device(vec![song("/a.mp3", "A")]);
        inventory.set_cloud(vec![song("/b.mp3", "B")]);

        let merged = inventory.set_cloud(vec![song("/c.mp3", "C")]).unwrap();
        assert_eq!(paths(merged), vec!["/a.mp3", "/c.mp3"]);

        let merged = inventory.set_device(Vec::new()).unwrap();
        assert_eq!(paths(merged), vec!["/c.mp3"]);
    }

    #[test]
    fn test_mark_updates_merged_and_sources() {
        let mut inventory = Inventory::new();
        inventory.set_device(Vec::new());
        inventory.set_cloud(vec![song("/a.mp3", "A")]);

        let merged = inventory
            .mark("/a.mp3", ActionState::PendingToDownload)
            .unwrap();
        assert_eq!(merged[0].state, ActionState::PendingToDownload);

        // unchanged state is not republished
        assert!(inventory
            .mark("/a.mp3", ActionState::PendingToDownload)
            .is_none());

        // the cloud source keeps the mark across a device re-emission
        let merged = inventory.set_device(Vec::new()).unwrap();
        assert_eq!(merged[0].state, ActionState::PendingToDownload);
    }

    #[test]
    fn test_find_prefers_merged_view() {
        let mut inventory = Inventory::new();
        inventory.set_cloud(vec![song("/a.mp3", "A")]);
        assert_eq!(inventory.find("/a.mp3").unwrap().name, "A");
        assert!(inventory.find("/missing.mp3").is_none());
    }
}
