//! Buffer resolution: combine every applicable policy scope into the one
//! effective rule enforced for a booking.

use ulid::Ulid;

use crate::limits::MAX_BUFFER_MIN;
use crate::model::EffectiveBuffer;
use crate::policy::{BufferRule, PolicySnapshot};

/// Which timeline a buffer is being resolved for. The staff timeline never
/// sees location rules and vice versa.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ResourceScope {
    Staff(Ulid),
    Location(Ulid),
}

/// Combine all four scopes. Independently for before and after, the result
/// is the maximum over every configured applicable rule: each buffer is a
/// floor imposed by one stakeholder, and a more specific but smaller rule
/// must not weaken a larger one. Returns zero when enforcement is disabled.
pub fn resolve(
    snapshot: &PolicySnapshot,
    service_id: Ulid,
    staff_id: Ulid,
    location_id: Ulid,
) -> EffectiveBuffer {
    if !snapshot.enforcement.enabled {
        return EffectiveBuffer::ZERO;
    }
    combine(
        snapshot.global,
        [
            snapshot.per_service.get(&service_id),
            snapshot.per_staff.get(&staff_id),
            snapshot.per_location.get(&location_id),
        ],
    )
}

/// Per-timeline variant: global + service + the rule for this one resource.
pub(crate) fn resolve_for(
    snapshot: &PolicySnapshot,
    service_id: Ulid,
    scope: ResourceScope,
) -> EffectiveBuffer {
    if !snapshot.enforcement.enabled {
        return EffectiveBuffer::ZERO;
    }
    let scoped = match scope {
        ResourceScope::Staff(id) => snapshot.per_staff.get(&id),
        ResourceScope::Location(id) => snapshot.per_location.get(&id),
    };
    combine(
        snapshot.global,
        [snapshot.per_service.get(&service_id), scoped, None],
    )
}

fn combine(global: BufferRule, overrides: [Option<&BufferRule>; 3]) -> EffectiveBuffer {
    let mut eb = EffectiveBuffer {
        before_min: global.before_min,
        after_min: global.after_min,
    };
    for rule in overrides.into_iter().flatten() {
        eb.before_min = eb.before_min.max(rule.before_min);
        eb.after_min = eb.after_min.max(rule.after_min);
    }
    // misconfigured rules cap at a day
    eb.before_min = eb.before_min.min(MAX_BUFFER_MIN);
    eb.after_min = eb.after_min.min(MAX_BUFFER_MIN);
    eb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::EnforcementSettings;

    fn enabled() -> EnforcementSettings {
        EnforcementSettings {
            enabled: true,
            strict_mode: false,
            allow_override: false,
        }
    }

    #[test]
    fn global_alone() {
        let snap = PolicySnapshot::new(enabled(), BufferRule::new(5, 10));
        let eb = resolve(&snap, Ulid::new(), Ulid::new(), Ulid::new());
        assert_eq!(eb, EffectiveBuffer { before_min: 5, after_min: 10 });
    }

    #[test]
    fn staff_rule_beats_smaller_service_rule() {
        let service = Ulid::new();
        let staff = Ulid::new();
        let snap = PolicySnapshot::new(enabled(), BufferRule::default())
            .with_service_rule(service, BufferRule::new(5, 0))
            .with_staff_rule(staff, BufferRule::new(20, 0));
        let eb = resolve(&snap, service, staff, Ulid::new());
        assert_eq!(eb.before_min, 20);
    }

    #[test]
    fn before_and_after_combine_independently() {
        let service = Ulid::new();
        let location = Ulid::new();
        let snap = PolicySnapshot::new(enabled(), BufferRule::new(3, 3))
            .with_service_rule(service, BufferRule::new(15, 0))
            .with_location_rule(location, BufferRule::new(0, 25));
        let eb = resolve(&snap, service, Ulid::new(), location);
        assert_eq!(eb, EffectiveBuffer { before_min: 15, after_min: 25 });
    }

    #[test]
    fn result_never_below_global() {
        let service = Ulid::new();
        let snap = PolicySnapshot::new(enabled(), BufferRule::new(10, 10))
            .with_service_rule(service, BufferRule::new(0, 0)); // explicit zero
        let eb = resolve(&snap, service, Ulid::new(), Ulid::new());
        assert_eq!(eb.before_min, 10);
        assert_eq!(eb.after_min, 10);
    }

    #[test]
    fn runaway_rule_caps_at_a_day() {
        let staff = Ulid::new();
        let snap = PolicySnapshot::new(enabled(), BufferRule::default())
            .with_staff_rule(staff, BufferRule::new(10_000, 5));
        let eb = resolve(&snap, Ulid::new(), staff, Ulid::new());
        assert_eq!(eb.before_min, MAX_BUFFER_MIN);
        assert_eq!(eb.after_min, 5);
    }

    #[test]
    fn disabled_enforcement_resolves_to_zero() {
        let snap = PolicySnapshot::new(
            EnforcementSettings {
                enabled: false,
                strict_mode: true,
                allow_override: true,
            },
            BufferRule::new(30, 30),
        );
        let eb = resolve(&snap, Ulid::new(), Ulid::new(), Ulid::new());
        assert_eq!(eb, EffectiveBuffer::ZERO);
    }

    #[test]
    fn staff_scope_ignores_location_rules() {
        let staff = Ulid::new();
        let location = Ulid::new();
        let snap = PolicySnapshot::new(enabled(), BufferRule::default())
            .with_location_rule(location, BufferRule::new(45, 45));
        // location rule must not leak into the staff timeline's buffer
        let eb = resolve_for(&snap, Ulid::new(), ResourceScope::Staff(staff));
        assert_eq!(eb, EffectiveBuffer::ZERO);
        let eb = resolve_for(&snap, Ulid::new(), ResourceScope::Location(location));
        assert_eq!(eb.before_min, 45);
    }
}
