use std::cmp::Ordering;

use crate::geo::{google_maps_directions_url, google_maps_url, haversine_km, round_km, Coordinates};
use crate::models::location::{NearbyCandidate, NearbyUser};
use crate::models::users::Role;

/// Keeps candidates within `radius_km` of `origin`, nearest first, ties broken by id.
pub fn rank_candidates(
    origin: &Coordinates,
    candidates: Vec<NearbyCandidate>,
    radius_km: f64,
) -> Vec<NearbyUser> {
    let mut within: Vec<(f64, NearbyCandidate, Coordinates)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let coords = Coordinates::new(candidate.latitude, candidate.longitude).ok()?;
            let distance = haversine_km(origin, &coords);
            (distance <= radius_km).then_some((distance, candidate, coords))
        })
        .collect();

    within.sort_by(|(da, a, _), (db, b, _)| {
        da.partial_cmp(db)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    within
        .into_iter()
        .filter_map(|(distance, candidate, coords)| {
            let role = match candidate.role.parse::<Role>() {
                Ok(role) => role,
                Err(e) => {
                    tracing::warn!(user_id = candidate.id, "Skipping nearby user: {}", e);
                    return None;
                }
            };
            Some(NearbyUser {
                id: candidate.id,
                name: candidate.name,
                role,
                city: candidate.city,
                is_online: candidate.is_online,
                live_sharing: candidate.live_sharing,
                last_seen_at: candidate.last_seen_at,
                distance_km: round_km(distance),
                maps_url: google_maps_url(&coords),
                directions_url: google_maps_directions_url(origin, &coords),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i32, latitude: f64, longitude: f64) -> NearbyCandidate {
        NearbyCandidate {
            id,
            name: format!("user {}", id),
            role: "teacher".into(),
            latitude,
            longitude,
            city: None,
            is_online: false,
            live_sharing: false,
            last_seen_at: None,
        }
    }

    fn origin() -> Coordinates {
        Coordinates::new(12.9716, 77.5946).unwrap()
    }

    #[test]
    fn results_are_sorted_by_distance() {
        let ranked = rank_candidates(
            &origin(),
            vec![
                candidate(1, 13.03, 77.62),
                candidate(2, 12.975, 77.60),
                candidate(3, 13.00, 77.60),
            ],
            10.0,
        );
        let ids: Vec<i32> = ranked.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn equal_distances_fall_back_to_id_order() {
        let ranked = rank_candidates(
            &origin(),
            vec![candidate(9, 13.0, 77.6), candidate(4, 13.0, 77.6)],
            10.0,
        );
        let ids: Vec<i32> = ranked.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![4, 9]);
    }

    #[test]
    fn candidates_outside_radius_are_dropped() {
        let ranked = rank_candidates(&origin(), vec![candidate(1, 13.5, 77.5946)], 10.0);
        assert!(ranked.is_empty());
    }

    #[test]
    fn unknown_roles_are_skipped() {
        let mut odd = candidate(1, 12.98, 77.6);
        odd.role = "guest".into();
        assert!(rank_candidates(&origin(), vec![odd], 10.0).is_empty());
    }

    #[test]
    fn entries_carry_map_links() {
        let ranked = rank_candidates(&origin(), vec![candidate(1, 12.98, 77.6)], 10.0);
        assert_eq!(ranked[0].maps_url, "https://www.google.com/maps?q=12.98,77.6");
        assert!(ranked[0].directions_url.contains("origin=12.9716,77.5946"));
    }
}
