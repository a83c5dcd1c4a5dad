use std::collections::{BTreeMap, BTreeSet, HashMap};

use hashlink::LinkedHashMap;

use muninn_core::protocol::UserId;

/// One row of the member directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub user_id: UserId,
    pub displayname: Option<String>,
    pub servers: BTreeSet<String>,
}

/// Forward map member -> servers and its inverse server -> members.
///
/// `u ∈ server_to_members[s] ⟺ s ∈ member_to_servers[u]` holds after every
/// call. The inverse is only ever adjusted by the difference between a
/// member's old and new server sets; empty inverse entries are removed.
/// Forward entries keep the order in which members were first indexed.
#[derive(Debug, Default)]
pub struct NameIndex {
    member_names: HashMap<UserId, Option<String>>,
    member_to_servers: LinkedHashMap<UserId, BTreeSet<String>>,
    server_to_members: HashMap<String, BTreeSet<UserId>>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a joined member's display name and declared servers.
    pub fn update_member(&mut self, user_id: &UserId, displayname: Option<String>, servers: BTreeSet<String>) {
        self.member_names.insert(user_id.clone(), displayname);

        let old = match self.member_to_servers.get_mut(user_id) {
            Some(slot) => {
                if *slot == servers {
                    return;
                }
                std::mem::replace(slot, servers.clone())
            }
            None => {
                self.member_to_servers.insert(user_id.clone(), servers.clone());
                BTreeSet::new()
            }
        };

        for server in old.difference(&servers) {
            self.remove_from_server(server, user_id);
        }
        for server in servers.difference(&old) {
            self.server_to_members
                .entry(server.clone())
                .or_default()
                .insert(user_id.clone());
        }
    }

    /// Drop a member that is no longer joined.
    pub fn remove_member(&mut self, user_id: &UserId) {
        self.member_names.remove(user_id);
        let Some(servers) = self.member_to_servers.remove(user_id) else {
            return;
        };
        for server in &servers {
            self.remove_from_server(server, user_id);
        }
    }

    fn remove_from_server(&mut self, server: &str, user_id: &UserId) {
        if let Some(members) = self.server_to_members.get_mut(server) {
            members.remove(user_id);
            if members.is_empty() {
                self.server_to_members.remove(server);
            }
        }
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.member_to_servers.contains_key(user_id)
    }

    pub fn servers_of(&self, user_id: &UserId) -> Option<&BTreeSet<String>> {
        self.member_to_servers.get(user_id)
    }

    pub fn members_of(&self, server: &str) -> Option<&BTreeSet<UserId>> {
        self.server_to_members.get(server)
    }

    pub fn displayname(&self, user_id: &UserId) -> Option<&str> {
        self.member_names.get(user_id).and_then(|n| n.as_deref())
    }

    pub fn len(&self) -> usize {
        self.member_to_servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_to_servers.is_empty()
    }

    pub fn server_count(&self) -> usize {
        self.server_to_members.len()
    }

    /// All indexed members in index order.
    pub fn directory(&self) -> Vec<DirectoryEntry> {
        self.member_to_servers
            .iter()
            .map(|(user_id, servers)| DirectoryEntry {
                user_id: user_id.clone(),
                displayname: self.displayname(user_id).map(str::to_string),
                servers: servers.clone(),
            })
            .collect()
    }

    /// Members whose display name declares no server, in index order.
    pub fn members_without_server(&self) -> Vec<DirectoryEntry> {
        self.directory()
            .into_iter()
            .filter(|e| e.servers.is_empty())
            .collect()
    }

    /// `server -> [members]`, for the machine-readable directory payload.
    pub fn server_map(&self) -> BTreeMap<String, Vec<UserId>> {
        self.server_to_members
            .iter()
            .map(|(server, members)| (server.clone(), members.iter().cloned().collect()))
            .collect()
    }

    /// Checks the forward/inverse invariant both ways.
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.member_to_servers.iter().all(|(user, servers)| {
            servers
                .iter()
                .all(|s| self.server_to_members.get(s).is_some_and(|m| m.contains(user)))
        });
        let inverse_ok = self.server_to_members.iter().all(|(server, members)| {
            !members.is_empty()
                && members
                    .iter()
                    .all(|u| self.member_to_servers.get(u).is_some_and(|s| s.contains(server)))
        });
        forward_ok && inverse_ok
    }
}
