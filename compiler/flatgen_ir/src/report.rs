//! Generation outcome as a value.
//!
//! Every degradation and every notable member classification lands in the
//! report instead of being printed on the way past. The emitter renders the
//! report into the companion log; tests assert on it directly.

/// Classification of a report entry.
///
/// Each category corresponds to one section of the companion log.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ReportCategory {
    BlacklistedStruct,
    BlacklistedStructType,
    PointerInUnion,
    FlexibleArrayMember,
    IncompleteArrayStorage,
    UserMemoryPointer,
    StructPointer,
    VerifiedStructPointer,
    ComplexMember,
    ComplexPointerMember,
    EnumPointer,
    CharPointer,
    VoidResolved,
    VoidAmbiguous,
    VoidUnresolved,
    BuiltinPointer,
    ContainerOfAmbiguous,
    CountAmbiguous,
    NotUsedMember,
    ZeroSizePointee,
    MissingDefinition,
    NonRecordSubject,
}

impl ReportCategory {
    /// Section heading in the companion log.
    pub const fn heading(self) -> &'static str {
        match self {
            ReportCategory::BlacklistedStruct => "Blacklisted structs",
            ReportCategory::BlacklistedStructType => "Blacklisted struct types",
            ReportCategory::PointerInUnion => "Pointers in union",
            ReportCategory::FlexibleArrayMember => "Flexible array members",
            ReportCategory::IncompleteArrayStorage => "Incomplete array storage members",
            ReportCategory::UserMemoryPointer => "Pointers to user memory",
            ReportCategory::StructPointer => "Pointers to structs",
            ReportCategory::VerifiedStructPointer => "Verified pointers to structs",
            ReportCategory::ComplexMember => "Complex members",
            ReportCategory::ComplexPointerMember => "Complex pointer members",
            ReportCategory::EnumPointer => "Pointers to enums",
            ReportCategory::CharPointer => "Pointers to char (strings)",
            ReportCategory::VoidResolved => "Pointers to void [resolved]",
            ReportCategory::VoidAmbiguous => "Pointers to void [ambiguous]",
            ReportCategory::VoidUnresolved => "Pointers to void [not resolved]",
            ReportCategory::BuiltinPointer => "Pointers to builtin",
            ReportCategory::ContainerOfAmbiguous => "Ambiguous container_of targets",
            ReportCategory::CountAmbiguous => "Ambiguous element counts",
            ReportCategory::NotUsedMember => "Unused pointer members",
            ReportCategory::ZeroSizePointee => "Zero-sized pointees",
            ReportCategory::MissingDefinition => "Missing record definitions",
            ReportCategory::NonRecordSubject => "Non-record subjects",
        }
    }

    /// Fixed order of sections in the companion log.
    pub const LOG_ORDER: &'static [ReportCategory] = &[
        ReportCategory::BlacklistedStruct,
        ReportCategory::BlacklistedStructType,
        ReportCategory::PointerInUnion,
        ReportCategory::FlexibleArrayMember,
        ReportCategory::IncompleteArrayStorage,
        ReportCategory::UserMemoryPointer,
        ReportCategory::StructPointer,
        ReportCategory::VerifiedStructPointer,
        ReportCategory::ComplexMember,
        ReportCategory::ComplexPointerMember,
        ReportCategory::EnumPointer,
        ReportCategory::CharPointer,
        ReportCategory::VoidResolved,
        ReportCategory::VoidAmbiguous,
        ReportCategory::VoidUnresolved,
        ReportCategory::BuiltinPointer,
        ReportCategory::ContainerOfAmbiguous,
        ReportCategory::CountAmbiguous,
        ReportCategory::NotUsedMember,
        ReportCategory::ZeroSizePointee,
        ReportCategory::MissingDefinition,
        ReportCategory::NonRecordSubject,
    ];
}

/// One recorded event.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ReportEntry {
    pub category: ReportCategory,
    /// Rendered subject, e.g. `struct net_device`.
    pub subject: String,
    /// Dotted member path within the subject, when the event is
    /// member-scoped.
    pub member: Option<String>,
    /// Free-form context, e.g. the list of conflicting targets.
    pub detail: Option<String>,
}

/// Member-level counters that cannot be recomputed from the store.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct RunStats {
    /// Members visited across all subjects.
    pub members_seen: u32,
    /// Members that produced a flattening node.
    pub member_recipes: u32,
    /// Pointer members whose count degraded to a probe.
    pub not_safe: u32,
    /// Pointer members with no recorded dereference.
    pub not_used: u32,
    /// Pointer members into user-space memory.
    pub user_memory: u32,
    /// Functions reachable from the entry point.
    pub functions_reachable: u32,
}

impl RunStats {
    pub fn merge(&mut self, other: &RunStats) {
        self.members_seen += other.members_seen;
        self.member_recipes += other.member_recipes;
        self.not_safe += other.not_safe;
        self.not_used += other.not_used;
        self.user_memory += other.user_memory;
        self.functions_reachable += other.functions_reachable;
    }
}

/// Accumulated outcome of a generation run.
#[derive(Default, Debug)]
pub struct GenerationReport {
    pub entries: Vec<ReportEntry>,
    pub stats: RunStats,
}

impl GenerationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subject-scoped event.
    pub fn note_subject(&mut self, category: ReportCategory, subject: String) {
        self.entries.push(ReportEntry {
            category,
            subject,
            member: None,
            detail: None,
        });
    }

    /// Record a member-scoped event.
    pub fn note_member(&mut self, category: ReportCategory, subject: String, member: String) {
        self.entries.push(ReportEntry {
            category,
            subject,
            member: Some(member),
            detail: None,
        });
    }

    /// Record a member-scoped event with context.
    pub fn note_member_detail(
        &mut self,
        category: ReportCategory,
        subject: String,
        member: String,
        detail: String,
    ) {
        self.entries.push(ReportEntry {
            category,
            subject,
            member: Some(member),
            detail: Some(detail),
        });
    }

    /// Entries in one category, in recording order.
    pub fn in_category(&self, category: ReportCategory) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    pub fn count(&self, category: ReportCategory) -> usize {
        self.in_category(category).count()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: GenerationReport) {
        self.entries.extend(other.entries);
        self.stats.merge(&other.stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_and_count() {
        let mut report = GenerationReport::new();
        report.note_member(
            ReportCategory::CharPointer,
            String::from("struct request"),
            String::from("cmd"),
        );
        report.note_member(
            ReportCategory::CharPointer,
            String::from("struct request"),
            String::from("sense"),
        );
        report.note_subject(
            ReportCategory::BlacklistedStruct,
            String::from("struct kflat"),
        );
        assert_eq!(report.count(ReportCategory::CharPointer), 2);
        assert_eq!(report.count(ReportCategory::BlacklistedStruct), 1);
        assert_eq!(report.count(ReportCategory::VoidAmbiguous), 0);
    }

    #[test]
    fn test_merge_sums_stats() {
        let mut a = GenerationReport::new();
        a.stats.members_seen = 10;
        a.stats.not_used = 2;
        let mut b = GenerationReport::new();
        b.stats.members_seen = 5;
        b.note_subject(
            ReportCategory::MissingDefinition,
            String::from("struct ghost"),
        );
        a.merge(b);
        assert_eq!(a.stats.members_seen, 15);
        assert_eq!(a.stats.not_used, 2);
        assert_eq!(a.count(ReportCategory::MissingDefinition), 1);
    }

    #[test]
    fn test_log_order_covers_every_category() {
        // A new category must be slotted into the log order explicitly.
        assert_eq!(ReportCategory::LOG_ORDER.len(), 22);
    }
}
