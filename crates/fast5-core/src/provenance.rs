//! Provenance chains between analysis groups
//!
//! A link is an attribute on an analysis group whose value is the path of
//! another analysis group, always written with the `Analyses/` prefix. The
//! attribute name is the component of the linked group.

use std::collections::HashSet;

use fast5_store::{AttrValue, Attributes, Store};
use indexmap::IndexMap;

use crate::error::{Fast5Error, Result};
use crate::file::Fast5File;
use crate::layout::{analysis_path, ANALYSES, COMPONENT_ATTR, CONFIG_ATTR};
use crate::sanitize::decode_value;

fn link_prefix() -> String {
    format!("{ANALYSES}/")
}

impl<S: Store> Fast5File<S> {
    /// Record that `group_name` was derived from the groups in `component_map`
    ///
    /// Keys are component names; values are group paths with or without the
    /// `Analyses/` prefix.
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if `group_name` does not exist
    pub fn add_chain(
        &mut self,
        group_name: &str,
        component_map: &IndexMap<String, String>,
    ) -> Result<()> {
        let prefix = link_prefix();
        let links: Attributes = component_map
            .iter()
            .map(|(component, target)| {
                let target = if target.starts_with(&prefix) {
                    target.clone()
                } else {
                    format!("{prefix}{target}")
                };
                (component.clone(), AttrValue::Text(target))
            })
            .collect();
        self.add_analysis_attributes(group_name, &links)
    }

    /// Provenance of `group_name`, depth first
    ///
    /// The first entry is `(component, group_name)` of the group itself.
    /// Every following entry is `(component, group_name)` of a linked group.
    /// Each group is visited at most once; links to missing groups are
    /// reported but not followed.
    ///
    /// # Errors
    /// - [`Fast5Error::GroupNotFound`] if `group_name` does not exist
    /// - [`Fast5Error::AttributeNotFound`] if it has no `component`
    pub fn get_chain(&self, group_name: &str) -> Result<Vec<(String, String)>> {
        let path = analysis_path(group_name)?;
        self.ensure_group(&path)?;
        let component = self
            .read_attr(&path, COMPONENT_ATTR)?
            .and_then(|v| v.as_text().map(str::to_string))
            .ok_or_else(|| Fast5Error::attribute_not_found(&path, COMPONENT_ATTR))?;

        let attrs = self.store.get_attrs(&path)?;
        let mut chain = vec![(component, group_name.to_string())];
        let mut visited = HashSet::from([path.to_string()]);
        self.follow_links(&attrs, &mut visited, &mut chain)?;
        Ok(chain)
    }

    /// `attrs` are in stored form; each value is decoded on its own
    fn follow_links(
        &self,
        attrs: &Attributes,
        visited: &mut HashSet<String>,
        chain: &mut Vec<(String, String)>,
    ) -> Result<()> {
        let prefix = link_prefix();
        for (name, value) in attrs {
            if name == COMPONENT_ATTR || name == CONFIG_ATTR {
                continue;
            }
            // Links are text; values that do not decode cannot be links.
            let Ok(value) = decode_value(value.clone()) else {
                continue;
            };
            let Some(target) = value.as_text().and_then(|v| v.strip_prefix(&prefix)) else {
                continue;
            };
            let path = analysis_path(target)?;
            if !visited.insert(path.to_string()) {
                tracing::debug!(group = target, "provenance link already visited");
                continue;
            }
            chain.push((name.clone(), target.to_string()));
            if self.store.group_exists(&path) {
                let linked = self.store.get_attrs(&path)?;
                self.follow_links(&linked, visited, chain)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
            .collect()
    }

    fn links(items: &[(&str, &str)]) -> IndexMap<String, String> {
        items
            .iter()
            .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
            .collect()
    }

    #[test]
    fn chain_follows_links_depth_first() {
        let mut f = Fast5File::in_memory().unwrap();
        for (component, group) in [
            ("first", "First_000"),
            ("second", "Second_000"),
            ("third", "Third_000"),
            ("fourth", "Fourth_000"),
        ] {
            f.add_analysis(component, Some(group), &Attributes::new()).unwrap();
        }
        f.add_chain("Second_000", &links(&[("first", "First_000")])).unwrap();
        f.add_chain(
            "Fourth_000",
            &links(&[("second", "Analyses/Second_000"), ("third", "Third_000")]),
        )
        .unwrap();

        assert_eq!(
            f.get_chain("Fourth_000").unwrap(),
            pairs(&[
                ("fourth", "Fourth_000"),
                ("second", "Second_000"),
                ("first", "First_000"),
                ("third", "Third_000"),
            ])
        );
        let stored = f.get_analysis_attributes("Fourth_000").unwrap();
        assert_eq!(stored["third"], AttrValue::from("Analyses/Third_000"));
    }

    #[test]
    fn cycles_terminate() {
        let mut f = Fast5File::in_memory().unwrap();
        f.add_analysis("a", Some("A_000"), &Attributes::new()).unwrap();
        f.add_analysis("b", Some("B_000"), &Attributes::new()).unwrap();
        f.add_chain("A_000", &links(&[("b", "B_000")])).unwrap();
        f.add_chain("B_000", &links(&[("a", "A_000")])).unwrap();

        assert_eq!(
            f.get_chain("A_000").unwrap(),
            pairs(&[("a", "A_000"), ("b", "B_000")])
        );
    }

    #[test]
    fn missing_targets_are_reported_not_followed() {
        let mut f = Fast5File::in_memory().unwrap();
        f.add_analysis("a", Some("A_000"), &Attributes::new()).unwrap();
        f.add_chain("A_000", &links(&[("gone", "Gone_000")])).unwrap();
        assert_eq!(
            f.get_chain("A_000").unwrap(),
            pairs(&[("a", "A_000"), ("gone", "Gone_000")])
        );
    }

    #[test]
    fn chain_requires_existing_group() {
        let mut f = Fast5File::in_memory().unwrap();
        assert!(matches!(
            f.add_chain("A_000", &links(&[("b", "B_000")])),
            Err(Fast5Error::GroupNotFound(_))
        ));
        assert!(matches!(
            f.get_chain("A_000"),
            Err(Fast5Error::GroupNotFound(_))
        ));
    }
}
