//! Reconciliation of unmapped designations.
//!
//! Rows whose designation has no cadre are collected, the operator picks a
//! cadre for each distinct designation, and confirmed picks are merged into
//! the mapping table before the dataset is classified again:
//!
//! ```text
//! Scanning --(nothing unmapped)--> Done
//! Scanning --(unmapped rows)-----> AwaitingInput --commit--> Committing --> Scanning
//!                                   AwaitingInput --skip----> Done
//! ```

use crate::cadre::Cadre;
use crate::classifier::{classify, unresolved};
use crate::error::{Result, WranglerError};
use crate::mapping::MappingTable;
use indexmap::IndexMap;
use polars::prelude::DataFrame;
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileState {
    Scanning,
    AwaitingInput { pending: Vec<String> },
    Committing,
    Done,
}

/// What the operator decided for one designation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorChoice {
    Pick(Cadre),
    /// Keep the designation unmapped for now.
    Leave,
    Abort,
}

/// Presentation seam for the reconciliation prompt.
pub trait OperatorPrompt {
    /// Ask for the cadre of one designation. `choices` never contains the sentinel.
    fn choose(&mut self, designation: &str, choices: &[Cadre]) -> Result<OperatorChoice>;

    /// Final confirmation before the picks are merged.
    fn confirm(&mut self, selections: &[(String, Cadre)]) -> Result<bool>;
}

#[derive(Debug)]
pub struct CommitOutcome {
    pub dataset: DataFrame,
    pub added: Vec<(String, Cadre)>,
    pub state: ReconcileState,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub dataset: DataFrame,
    pub added: Vec<(String, Cadre)>,
    /// Designations the operator left unmapped.
    pub unresolved: Vec<String>,
}

pub struct Reconciler {
    designation_column: String,
    state: ReconcileState,
    selections: IndexMap<String, Option<Cadre>>,
}

impl Reconciler {
    pub fn new(designation_column: impl Into<String>) -> Self {
        Self {
            designation_column: designation_column.into(),
            state: ReconcileState::Scanning,
            selections: IndexMap::new(),
        }
    }

    pub fn state(&self) -> &ReconcileState {
        &self.state
    }

    pub fn pending(&self) -> Vec<&str> {
        self.selections.keys().map(String::as_str).collect()
    }

    pub fn selection(&self, designation: &str) -> Option<Cadre> {
        self.selections.get(designation).copied().flatten()
    }

    /// Recompute the unmapped designations of a classified dataset.
    ///
    /// Picks already made for designations that are still pending survive.
    pub fn scan(&mut self, df: &DataFrame) -> Result<&ReconcileState> {
        self.state = ReconcileState::Scanning;
        let pending = unresolved(df, &self.designation_column)?;

        let mut selections = IndexMap::with_capacity(pending.len());
        for designation in &pending {
            let kept = self.selections.get(designation).copied().flatten();
            selections.insert(designation.clone(), kept);
        }
        self.selections = selections;

        self.state = if pending.is_empty() {
            ReconcileState::Done
        } else {
            info!("Found {} designation(s) that need mapping", pending.len());
            ReconcileState::AwaitingInput { pending }
        };
        Ok(&self.state)
    }

    pub fn select(&mut self, designation: &str, cadre: Cadre) -> Result<()> {
        match self.selections.get_mut(designation) {
            Some(slot) => {
                *slot = Some(cadre);
                Ok(())
            }
            None => Err(WranglerError::NotPending(designation.to_string())),
        }
    }

    pub fn clear(&mut self, designation: &str) -> Result<()> {
        match self.selections.get_mut(designation) {
            Some(slot) => {
                *slot = None;
                Ok(())
            }
            None => Err(WranglerError::NotPending(designation.to_string())),
        }
    }

    fn chosen(&self) -> Vec<(String, Cadre)> {
        self.selections
            .iter()
            .filter_map(|(d, c)| c.map(|c| (d.clone(), c)))
            .collect()
    }

    /// Merge every picked cadre into `table`, reclassify and rescan.
    ///
    /// Designations without a pick stay unmapped and remain pending.
    pub fn commit(&mut self, table: &mut MappingTable, df: &DataFrame) -> Result<CommitOutcome> {
        self.state = ReconcileState::Committing;
        let added = self.chosen();
        for (designation, cadre) in &added {
            table.upsert(designation.clone(), *cadre);
        }
        info!("Committed {} new mapping(s)", added.len());

        let dataset = match classify(df.clone(), &self.designation_column, table).into_result() {
            Ok(dataset) => dataset,
            Err(e) => {
                self.scan(df)?;
                return Err(e);
            }
        };
        let state = self.scan(&dataset)?.clone();
        Ok(CommitOutcome { dataset, added, state })
    }

    /// Proceed with the remaining rows left as `Unmapped`.
    pub fn skip(&mut self) {
        if !self.selections.is_empty() {
            warn!("Proceeding with {} unmapped designation(s)", self.selections.len());
        }
        self.state = ReconcileState::Done;
    }

    /// Drive the loop with an operator until it reaches `Done`.
    pub fn run(
        &mut self,
        prompt: &mut dyn OperatorPrompt,
        table: &mut MappingTable,
        df: DataFrame,
    ) -> Result<RunOutcome> {
        let mut current = df;
        let mut added = Vec::new();
        let mut declined: HashSet<String> = HashSet::new();

        loop {
            let pending = match self.scan(&current)? {
                ReconcileState::AwaitingInput { pending } => pending.clone(),
                _ => break,
            };

            for designation in pending.iter() {
                if declined.contains(designation) {
                    continue;
                }
                match prompt.choose(designation, &Cadre::ALL)? {
                    OperatorChoice::Pick(cadre) => self.select(designation, cadre)?,
                    OperatorChoice::Leave => {
                        declined.insert(designation.clone());
                    }
                    OperatorChoice::Abort => return Err(WranglerError::Aborted),
                }
            }

            let chosen = self.chosen();
            if chosen.is_empty() || !prompt.confirm(&chosen)? {
                self.skip();
                break;
            }

            let outcome = self.commit(table, &current)?;
            added.extend(outcome.added);
            current = outcome.dataset;
        }

        Ok(RunOutcome {
            dataset: current,
            added,
            unresolved: self.pending().into_iter().map(str::to_string).collect(),
        })
    }
}

/// Numbered-menu prompt over a line reader, used on the terminal.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> OperatorPrompt for TerminalPrompt<R, W> {
    fn choose(&mut self, designation: &str, choices: &[Cadre]) -> Result<OperatorChoice> {
        writeln!(self.output, "\nNew designation: {}", designation)?;
        for (idx, cadre) in choices.iter().enumerate() {
            writeln!(self.output, "  {}. {}", idx + 1, cadre)?;
        }

        loop {
            write!(
                self.output,
                "Select cadre (1-{}, name, blank to leave unmapped, q to stop): ",
                choices.len()
            )?;
            self.output.flush()?;

            let answer = match self.read_answer()? {
                Some(answer) => answer,
                None => return Ok(OperatorChoice::Leave),
            };
            if answer.is_empty() {
                return Ok(OperatorChoice::Leave);
            }
            if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
                return Ok(OperatorChoice::Abort);
            }
            if let Ok(n) = answer.parse::<usize>() {
                if (1..=choices.len()).contains(&n) {
                    return Ok(OperatorChoice::Pick(choices[n - 1]));
                }
                writeln!(self.output, "Choice must be between 1 and {}", choices.len())?;
                continue;
            }
            match answer.parse::<Cadre>() {
                Ok(cadre) if choices.contains(&cadre) => return Ok(OperatorChoice::Pick(cadre)),
                _ => match Cadre::closest(&answer) {
                    Some(suggestion) => {
                        writeln!(self.output, "Unknown cadre '{}'. Did you mean '{}'?", answer, suggestion)?
                    }
                    None => writeln!(self.output, "Unknown cadre '{}'", answer)?,
                },
            }
        }
    }

    fn confirm(&mut self, selections: &[(String, Cadre)]) -> Result<bool> {
        writeln!(self.output, "\nNew mappings:")?;
        for (designation, cadre) in selections {
            writeln!(self.output, "  - {}: {}", designation, cadre)?;
        }
        write!(self.output, "Confirm new mappings? [y/N]: ")?;
        self.output.flush()?;

        Ok(matches!(
            self.read_answer()?.as_deref().map(str::to_lowercase).as_deref(),
            Some("y") | Some("yes")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadre::{CADRE_COLUMN, UNMAPPED};
    use crate::dataset;
    use polars::prelude::*;
    use std::collections::VecDeque;

    struct ScriptedPrompt {
        answers: VecDeque<OperatorChoice>,
        confirm: bool,
        asked: Vec<String>,
    }

    impl ScriptedPrompt {
        fn new(answers: Vec<OperatorChoice>, confirm: bool) -> Self {
            Self {
                answers: answers.into(),
                confirm,
                asked: Vec::new(),
            }
        }
    }

    impl OperatorPrompt for ScriptedPrompt {
        fn choose(&mut self, designation: &str, choices: &[Cadre]) -> Result<OperatorChoice> {
            assert_eq!(choices.len(), 5);
            self.asked.push(designation.to_string());
            Ok(self.answers.pop_front().unwrap_or(OperatorChoice::Leave))
        }

        fn confirm(&mut self, _selections: &[(String, Cadre)]) -> Result<bool> {
            Ok(self.confirm)
        }
    }

    fn classified(designations: &[&str], table: &MappingTable) -> DataFrame {
        let df = df!["designation_title" => designations].unwrap();
        classify(df, "designation_title", table).into_result().unwrap()
    }

    #[test]
    fn test_scan_done_when_everything_mapped() {
        let (table, _) = MappingTable::seeded().unwrap();
        let df = classified(&["DDHO", "UCMO"], &table);

        let mut reconciler = Reconciler::new("designation_title");
        assert_eq!(reconciler.scan(&df).unwrap(), &ReconcileState::Done);
    }

    #[test]
    fn test_no_default_selection() {
        let (table, _) = MappingTable::seeded().unwrap();
        let df = classified(&["Nurse Supervisor"], &table);

        let mut reconciler = Reconciler::new("designation_title");
        reconciler.scan(&df).unwrap();
        assert_eq!(reconciler.selection("Nurse Supervisor"), None);
        assert!(matches!(reconciler.select("DDHO", Cadre::UcLevel), Err(WranglerError::NotPending(_))));
    }

    #[test]
    fn test_commit_resolves_selected_designation() {
        let (mut table, _) = MappingTable::seeded().unwrap();
        let df = classified(&["Nurse Supervisor", "DDHO", "Nurse Supervisor"], &table);

        let mut reconciler = Reconciler::new("designation_title");
        reconciler.scan(&df).unwrap();
        reconciler.select("Nurse Supervisor", Cadre::TownLevel).unwrap();
        let outcome = reconciler.commit(&mut table, &df).unwrap();

        assert_eq!(outcome.state, ReconcileState::Done);
        assert_eq!(outcome.added, vec![("Nurse Supervisor".to_string(), Cadre::TownLevel)]);
        assert_eq!(
            dataset::column_strings(&outcome.dataset, CADRE_COLUMN).unwrap(),
            vec![
                Some("Town Level".to_string()),
                Some("District Level".to_string()),
                Some("Town Level".to_string())
            ]
        );
    }

    #[test]
    fn test_null_designation_must_be_mapped_before_done() {
        let mut table = MappingTable::new();
        let df = df!["designation_title" => [Some("A"), None]].unwrap();
        let df = classify(df, "designation_title", &table).into_result().unwrap();

        let mut reconciler = Reconciler::new("designation_title");
        assert_eq!(
            reconciler.scan(&df).unwrap(),
            &ReconcileState::AwaitingInput {
                pending: vec!["A".to_string(), "N/A".to_string()]
            }
        );

        reconciler.select("A", Cadre::UcLevel).unwrap();
        reconciler.select("N/A", Cadre::TownLevel).unwrap();
        let outcome = reconciler.commit(&mut table, &df).unwrap();

        assert_eq!(outcome.state, ReconcileState::Done);
        let cadres = dataset::column_strings(&outcome.dataset, CADRE_COLUMN).unwrap();
        assert!(cadres.iter().all(|c| c.as_deref() != Some(UNMAPPED)));
    }

    #[test]
    fn test_partial_commit_keeps_rest_pending() {
        let mut table = MappingTable::new();
        let df = classified(&["A", "B"], &table);

        let mut reconciler = Reconciler::new("designation_title");
        reconciler.scan(&df).unwrap();
        reconciler.select("A", Cadre::UcLevel).unwrap();
        let outcome = reconciler.commit(&mut table, &df).unwrap();

        assert_eq!(outcome.state, ReconcileState::AwaitingInput { pending: vec!["B".to_string()] });
        assert_eq!(reconciler.pending(), vec!["B"]);
    }

    #[test]
    fn test_run_with_operator() {
        let mut table = MappingTable::new();
        let df = classified(&["A", "B", "C"], &table);
        let mut prompt = ScriptedPrompt::new(
            vec![
                OperatorChoice::Pick(Cadre::FederalLevel),
                OperatorChoice::Leave,
                OperatorChoice::Pick(Cadre::TownLevel),
            ],
            true,
        );

        let mut reconciler = Reconciler::new("designation_title");
        let outcome = reconciler.run(&mut prompt, &mut table, df).unwrap();

        assert_eq!(reconciler.state(), &ReconcileState::Done);
        assert_eq!(outcome.added.len(), 2);
        assert_eq!(outcome.unresolved, vec!["B"]);
        // "B" was declined once and is not asked again.
        assert_eq!(prompt.asked, vec!["A", "B", "C"]);
        assert_eq!(table.len(), 2);
        let cadres = dataset::column_strings(&outcome.dataset, CADRE_COLUMN).unwrap();
        assert_eq!(cadres[1].as_deref(), Some(UNMAPPED));
    }

    #[test]
    fn test_run_without_confirmation_changes_nothing() {
        let mut table = MappingTable::new();
        let df = classified(&["A"], &table);
        let mut prompt = ScriptedPrompt::new(vec![OperatorChoice::Pick(Cadre::UcLevel)], false);

        let outcome = Reconciler::new("designation_title")
            .run(&mut prompt, &mut table, df)
            .unwrap();

        assert!(table.is_empty());
        assert!(outcome.added.is_empty());
        assert_eq!(outcome.unresolved, vec!["A"]);
    }

    #[test]
    fn test_run_abort() {
        let mut table = MappingTable::new();
        let df = classified(&["A"], &table);
        let mut prompt = ScriptedPrompt::new(vec![OperatorChoice::Abort], true);

        let err = Reconciler::new("designation_title")
            .run(&mut prompt, &mut table, df)
            .unwrap_err();
        assert!(matches!(err, WranglerError::Aborted));
    }

    #[test]
    fn test_terminal_prompt_parsing() {
        let input = b"9\nTown Levl\nprovincial level\n\n3\ny\n" as &[u8];
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new(input, &mut out);

        assert_eq!(
            prompt.choose("X", &Cadre::ALL).unwrap(),
            OperatorChoice::Pick(Cadre::ProvincialLevel)
        );
        assert_eq!(prompt.choose("Y", &Cadre::ALL).unwrap(), OperatorChoice::Leave);
        assert_eq!(
            prompt.choose("Z", &Cadre::ALL).unwrap(),
            OperatorChoice::Pick(Cadre::ProvincialLevel)
        );
        assert!(prompt.confirm(&[("Z".to_string(), Cadre::ProvincialLevel)]).unwrap());

        let transcript = String::from_utf8(out).unwrap();
        assert!(transcript.contains("Did you mean 'Town Level'?"));
        assert!(transcript.contains("Choice must be between 1 and 5"));
    }
}
