//! Status mapping table and its configuration document.
//!
//! The document is deserialized into [`MappingDocument`] and then validated
//! into a [`StatusMappingTable`]. Validation is exhaustive and happens once:
//! every status a rule mentions must exist in the matching vocabulary, so
//! request handling never meets an undefined code.

use super::{
    EntityType, MappingConfigError, StatusCode, StatusDefinition, StatusVocabulary, StepName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw status mapping document as written in YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingDocument {
    /// Status vocabularies, one list per entity type.
    pub statuses: VocabularyDocument,
    /// Version status to candidate task statuses.
    #[serde(default)]
    pub version_to_task: BTreeMap<String, Vec<String>>,
    /// Task status to candidate shot statuses.
    #[serde(default)]
    pub task_to_shot: BTreeMap<String, Vec<String>>,
    /// Shot status to candidate task statuses.
    #[serde(default)]
    pub shot_to_task: BTreeMap<String, Vec<String>>,
    /// Fanout rules keyed by the triggering workflow step.
    #[serde(default)]
    pub step_fanout: BTreeMap<String, StepFanoutDocument>,
    /// Initial status assignment for newly created versions.
    #[serde(default)]
    pub version_created: Option<VersionCreatedDocument>,
    /// Whether a version-driven task update also applies the task's shot
    /// mapping.
    #[serde(default)]
    pub chain_version_to_shot: bool,
}

/// Per-entity-type vocabulary lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VocabularyDocument {
    /// Task statuses.
    pub task: Vec<StatusEntryDocument>,
    /// Version statuses.
    pub version: Vec<StatusEntryDocument>,
    /// Shot statuses.
    pub shot: Vec<StatusEntryDocument>,
}

/// One `{key, label}` vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusEntryDocument {
    /// Status key.
    pub key: String,
    /// Display label; defaults to the key.
    #[serde(default)]
    pub label: String,
}

/// Raw step fanout rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepFanoutDocument {
    /// Task status that fires the rule.
    pub triggers_on_status: String,
    /// Sibling steps whose tasks are updated.
    pub update_steps: Vec<String>,
    /// Status applied to the sibling tasks.
    pub new_status: String,
}

/// Raw version-created rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionCreatedDocument {
    /// Steps whose new versions receive `initial_status`.
    pub eligible_steps: Vec<String>,
    /// Version status assigned on eligible steps.
    pub initial_status: String,
    /// Version status assigned elsewhere, if any.
    #[serde(default)]
    pub ineligible_status: Option<String>,
}

/// `(entity type, status)` pair returned by [`StatusMappingTable::lookup`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StatusTarget {
    /// Entity type receiving the status.
    pub entity_type: EntityType,
    /// Status to apply.
    pub status: StatusCode,
}

/// Directed edge from a source status to ordered target statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    source_type: EntityType,
    source_status: StatusCode,
    target_type: EntityType,
    preferred: StatusCode,
    targets: Vec<StatusCode>,
}

impl MappingRule {
    /// Returns the entity type whose status triggers the rule.
    #[must_use]
    pub const fn source_type(&self) -> EntityType {
        self.source_type
    }

    /// Returns the triggering status.
    #[must_use]
    pub const fn source_status(&self) -> &StatusCode {
        &self.source_status
    }

    /// Returns the entity type receiving the status.
    #[must_use]
    pub const fn target_type(&self) -> EntityType {
        self.target_type
    }

    /// Returns the status applied when the target needs updating.
    #[must_use]
    pub const fn preferred(&self) -> &StatusCode {
        &self.preferred
    }

    /// Returns all target statuses in preference order.
    #[must_use]
    pub fn targets(&self) -> &[StatusCode] {
        &self.targets
    }
}

/// Sibling-step fanout rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFanoutRule {
    step: StepName,
    triggers_on: StatusCode,
    update_steps: Vec<StepName>,
    new_status: StatusCode,
}

impl StepFanoutRule {
    /// Returns the step owning the rule.
    #[must_use]
    pub const fn step(&self) -> &StepName {
        &self.step
    }

    /// Returns the triggering task status.
    #[must_use]
    pub const fn triggers_on(&self) -> &StatusCode {
        &self.triggers_on
    }

    /// Returns the sibling steps to update.
    #[must_use]
    pub fn update_steps(&self) -> &[StepName] {
        &self.update_steps
    }

    /// Returns the status applied to sibling tasks.
    #[must_use]
    pub const fn new_status(&self) -> &StatusCode {
        &self.new_status
    }

    /// Returns `true` when a task reaching `status` fires the rule.
    #[must_use]
    pub fn fires_on(&self, status: &StatusCode) -> bool {
        self.triggers_on == *status
    }
}

/// Initial status assignment for new versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCreatedRule {
    eligible_steps: Vec<StepName>,
    initial_status: StatusCode,
    ineligible_status: Option<StatusCode>,
}

impl VersionCreatedRule {
    /// Returns the eligible steps.
    #[must_use]
    pub fn eligible_steps(&self) -> &[StepName] {
        &self.eligible_steps
    }

    /// Returns the status for versions created on an eligible step.
    #[must_use]
    pub const fn initial_status(&self) -> &StatusCode {
        &self.initial_status
    }

    /// Returns the status for versions created elsewhere, if configured.
    #[must_use]
    pub const fn ineligible_status(&self) -> Option<&StatusCode> {
        self.ineligible_status.as_ref()
    }

    /// Returns `true` when `step` is eligible; an unknown step never is.
    #[must_use]
    pub fn is_eligible(&self, step: Option<&StepName>) -> bool {
        step.is_some_and(|name| self.eligible_steps.contains(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Vocabularies {
    task: StatusVocabulary,
    version: StatusVocabulary,
    shot: StatusVocabulary,
}

impl Vocabularies {
    const fn get(&self, entity_type: EntityType) -> &StatusVocabulary {
        match entity_type {
            EntityType::Task => &self.task,
            EntityType::Version => &self.version,
            EntityType::Shot => &self.shot,
        }
    }
}

/// Validated, immutable status mapping table.
///
/// Built once at startup and shared by reference; every accessor is a pure
/// read, so concurrent requests need no synchronisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMappingTable {
    vocabularies: Vocabularies,
    rules: BTreeMap<(EntityType, StatusCode), Vec<MappingRule>>,
    fanout: BTreeMap<StepName, StepFanoutRule>,
    version_created: Option<VersionCreatedRule>,
    chain_version_to_shot: bool,
}

impl StatusMappingTable {
    /// Parses and validates a YAML mapping document.
    ///
    /// # Errors
    ///
    /// Returns [`MappingConfigError::Malformed`] when the YAML does not match
    /// the document schema, or any validation error from
    /// [`Self::from_document`].
    pub fn from_yaml_str(source: &str) -> Result<Self, MappingConfigError> {
        let document: MappingDocument = serde_yaml::from_str(source)
            .map_err(|err| MappingConfigError::Malformed(err.to_string()))?;
        Self::from_document(document)
    }

    /// Validates a deserialized mapping document.
    ///
    /// # Errors
    ///
    /// Returns [`MappingConfigError`] when a vocabulary repeats a key, a rule
    /// references an undefined status, a mapping has no targets, or a fanout
    /// or version-created rule lists no steps.
    pub fn from_document(document: MappingDocument) -> Result<Self, MappingConfigError> {
        let MappingDocument {
            statuses,
            version_to_task,
            task_to_shot,
            shot_to_task,
            step_fanout,
            version_created,
            chain_version_to_shot,
        } = document;

        let vocabularies = Vocabularies {
            task: build_vocabulary(EntityType::Task, statuses.task)?,
            version: build_vocabulary(EntityType::Version, statuses.version)?,
            shot: build_vocabulary(EntityType::Shot, statuses.shot)?,
        };

        let mut rules: BTreeMap<(EntityType, StatusCode), Vec<MappingRule>> = BTreeMap::new();
        let directions = [
            (EntityType::Version, EntityType::Task, version_to_task),
            (EntityType::Task, EntityType::Shot, task_to_shot),
            (EntityType::Shot, EntityType::Task, shot_to_task),
        ];
        for (source_type, target_type, entries) in directions {
            for rule in build_direction(&vocabularies, source_type, target_type, entries)? {
                rules
                    .entry((source_type, rule.source_status.clone()))
                    .or_default()
                    .push(rule);
            }
        }

        let mut fanout = BTreeMap::new();
        for (step, raw) in step_fanout {
            let rule = build_fanout(&vocabularies, step, raw)?;
            fanout.insert(rule.step.clone(), rule);
        }

        let version_created = version_created
            .map(|raw| build_version_created(&vocabularies, raw))
            .transpose()?;

        Ok(Self {
            vocabularies,
            rules,
            fanout,
            version_created,
            chain_version_to_shot,
        })
    }

    /// Returns every `(target type, target status)` pair mapped from
    /// `status` on `entity_type`, in document order.
    ///
    /// An unmapped status yields an empty list; that is a valid no-op.
    #[must_use]
    pub fn lookup(&self, entity_type: EntityType, status: &StatusCode) -> Vec<StatusTarget> {
        self.rules
            .get(&(entity_type, status.clone()))
            .into_iter()
            .flatten()
            .flat_map(|rule| {
                rule.targets.iter().map(|target| StatusTarget {
                    entity_type: rule.target_type,
                    status: target.clone(),
                })
            })
            .collect()
    }

    /// Returns the rule mapping `status` on `source_type` onto
    /// `target_type`, if any.
    #[must_use]
    pub fn rule(
        &self,
        source_type: EntityType,
        status: &StatusCode,
        target_type: EntityType,
    ) -> Option<&MappingRule> {
        self.rules
            .get(&(source_type, status.clone()))?
            .iter()
            .find(|rule| rule.target_type == target_type)
    }

    /// Returns the ordered target statuses for one direction, or an empty
    /// slice when `status` is unmapped.
    #[must_use]
    pub fn candidates(
        &self,
        source_type: EntityType,
        status: &StatusCode,
        target_type: EntityType,
    ) -> &[StatusCode] {
        self.rule(source_type, status, target_type)
            .map_or(&[], MappingRule::targets)
    }

    /// Returns `true` when `status` belongs to `entity_type`'s vocabulary.
    #[must_use]
    pub fn is_valid_status(&self, entity_type: EntityType, status: &StatusCode) -> bool {
        self.vocabularies.get(entity_type).contains(status)
    }

    /// Returns the vocabulary of `entity_type`.
    #[must_use]
    pub const fn vocabulary(&self, entity_type: EntityType) -> &StatusVocabulary {
        self.vocabularies.get(entity_type)
    }

    /// Iterates over every mapping rule.
    pub fn rules(&self) -> impl Iterator<Item = &MappingRule> {
        self.rules.values().flatten()
    }

    /// Returns the fanout rule owned by `step`, if any.
    #[must_use]
    pub fn fanout_rule(&self, step: &StepName) -> Option<&StepFanoutRule> {
        self.fanout.get(step)
    }

    /// Iterates over all fanout rules ordered by step name.
    pub fn fanout_rules(&self) -> impl Iterator<Item = &StepFanoutRule> {
        self.fanout.values()
    }

    /// Returns the version-created rule, if configured.
    #[must_use]
    pub const fn version_created_rule(&self) -> Option<&VersionCreatedRule> {
        self.version_created.as_ref()
    }

    /// Returns `true` when version-driven task updates also map to shots.
    #[must_use]
    pub const fn chains_version_to_shot(&self) -> bool {
        self.chain_version_to_shot
    }
}

fn build_vocabulary(
    entity_type: EntityType,
    entries: Vec<StatusEntryDocument>,
) -> Result<StatusVocabulary, MappingConfigError> {
    let definitions = entries
        .into_iter()
        .map(|entry| {
            let key = StatusCode::new(entry.key).map_err(|err| {
                MappingConfigError::invalid_value(format!("{entity_type} vocabulary"), err)
            })?;
            let label = if entry.label.trim().is_empty() {
                key.as_str().to_owned()
            } else {
                entry.label
            };
            Ok(StatusDefinition::new(key, label))
        })
        .collect::<Result<Vec<_>, MappingConfigError>>()?;

    StatusVocabulary::new(definitions).map_err(|duplicate| MappingConfigError::DuplicateStatus {
        entity_type,
        status: duplicate.into(),
    })
}

fn known_status(
    vocabularies: &Vocabularies,
    entity_type: EntityType,
    raw: String,
    context: &str,
) -> Result<StatusCode, MappingConfigError> {
    let status =
        StatusCode::new(raw).map_err(|err| MappingConfigError::invalid_value(context, err))?;
    if !vocabularies.get(entity_type).contains(&status) {
        return Err(MappingConfigError::UndefinedStatus {
            context: context.to_owned(),
            entity_type,
            status: status.into(),
        });
    }
    Ok(status)
}

fn direction_name(source_type: EntityType, target_type: EntityType) -> String {
    format!(
        "{}_to_{}",
        source_type.as_str().to_ascii_lowercase(),
        target_type.as_str().to_ascii_lowercase()
    )
}

fn build_direction(
    vocabularies: &Vocabularies,
    source_type: EntityType,
    target_type: EntityType,
    entries: BTreeMap<String, Vec<String>>,
) -> Result<Vec<MappingRule>, MappingConfigError> {
    let context = direction_name(source_type, target_type);
    entries
        .into_iter()
        .map(|(source, raw_targets)| {
            let source_status = known_status(vocabularies, source_type, source, &context)?;
            let targets = raw_targets
                .into_iter()
                .map(|raw| known_status(vocabularies, target_type, raw, &context))
                .collect::<Result<Vec<_>, _>>()?;
            let preferred =
                targets
                    .first()
                    .cloned()
                    .ok_or_else(|| MappingConfigError::EmptyTargets {
                        context: context.clone(),
                        status: source_status.as_str().to_owned(),
                    })?;
            Ok(MappingRule {
                source_type,
                source_status,
                target_type,
                preferred,
                targets,
            })
        })
        .collect()
}

fn build_fanout(
    vocabularies: &Vocabularies,
    step: String,
    raw: StepFanoutDocument,
) -> Result<StepFanoutRule, MappingConfigError> {
    let step_name =
        StepName::new(step).map_err(|err| MappingConfigError::invalid_value("step_fanout", err))?;
    let context = format!("step_fanout rule for '{step_name}'");
    let triggers_on = known_status(
        vocabularies,
        EntityType::Task,
        raw.triggers_on_status,
        &context,
    )?;
    let new_status = known_status(vocabularies, EntityType::Task, raw.new_status, &context)?;
    let update_steps = raw
        .update_steps
        .into_iter()
        .map(|name| {
            StepName::new(name).map_err(|err| MappingConfigError::invalid_value(&context, err))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if update_steps.is_empty() {
        return Err(MappingConfigError::EmptyFanoutSteps(step_name.into()));
    }

    Ok(StepFanoutRule {
        step: step_name,
        triggers_on,
        update_steps,
        new_status,
    })
}

fn build_version_created(
    vocabularies: &Vocabularies,
    raw: VersionCreatedDocument,
) -> Result<VersionCreatedRule, MappingConfigError> {
    const CONTEXT: &str = "version_created rule";
    let eligible_steps = raw
        .eligible_steps
        .into_iter()
        .map(|name| {
            StepName::new(name).map_err(|err| MappingConfigError::invalid_value(CONTEXT, err))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if eligible_steps.is_empty() {
        return Err(MappingConfigError::EmptyEligibleSteps);
    }
    let initial_status = known_status(
        vocabularies,
        EntityType::Version,
        raw.initial_status,
        CONTEXT,
    )?;
    let ineligible_status = raw
        .ineligible_status
        .map(|status| known_status(vocabularies, EntityType::Version, status, CONTEXT))
        .transpose()?;

    Ok(VersionCreatedRule {
        eligible_steps,
        initial_status,
        ineligible_status,
    })
}
