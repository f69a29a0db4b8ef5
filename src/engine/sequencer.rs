use serde::{Deserialize, Serialize};

use crate::geo::{distance_km, Coordinate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerPickup {
    pub id: String,
    pub pickup: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickupLeg {
    /// Passenger picked up at the end of this leg, `None` for the final leg
    /// to the destination.
    pub passenger_id: Option<String>,
    pub distance_km: f64,
    pub cumulative_km: f64,
    pub cumulative_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickupPlan {
    pub order: Vec<String>,
    pub legs: Vec<PickupLeg>,
    pub total_distance_km: f64,
    pub estimated_minutes: f64,
}

/// Orders pickups with a greedy nearest-neighbour walk.
///
/// From the driver's start, the closest unvisited pickup is taken next until
/// none remain, then the route finishes at `final_destination`. This is a
/// heuristic: it gives a reasonable route, not the shortest one. Equal
/// distances resolve to the passenger listed first. Runs in O(n²), which is
/// fine for a single vehicle's passengers.
pub fn sequence(
    driver_start: Coordinate,
    passengers: &[PassengerPickup],
    final_destination: Coordinate,
    average_speed_kmh: f64,
) -> PickupPlan {
    let mut visited = vec![false; passengers.len()];
    let mut order = Vec::with_capacity(passengers.len());
    let mut legs = Vec::with_capacity(passengers.len() + 1);
    let mut current = driver_start;
    let mut cumulative_km = 0.0;

    for _ in 0..passengers.len() {
        let mut nearest: Option<(usize, f64)> = None;

        for (index, passenger) in passengers.iter().enumerate() {
            if visited[index] {
                continue;
            }

            let distance = distance_km(&current, &passenger.pickup);
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((index, distance)),
            }
        }

        let Some((index, distance)) = nearest else {
            break;
        };

        visited[index] = true;
        current = passengers[index].pickup;
        cumulative_km += distance;
        order.push(passengers[index].id.clone());
        legs.push(PickupLeg {
            passenger_id: Some(passengers[index].id.clone()),
            distance_km: distance,
            cumulative_km,
            cumulative_minutes: minutes_for(cumulative_km, average_speed_kmh),
        });
    }

    let final_leg = distance_km(&current, &final_destination);
    cumulative_km += final_leg;
    let estimated_minutes = minutes_for(cumulative_km, average_speed_kmh);
    legs.push(PickupLeg {
        passenger_id: None,
        distance_km: final_leg,
        cumulative_km,
        cumulative_minutes: estimated_minutes,
    });

    PickupPlan {
        order,
        legs,
        total_distance_km: cumulative_km,
        estimated_minutes,
    }
}

fn minutes_for(distance_km: f64, average_speed_kmh: f64) -> f64 {
    if average_speed_kmh <= 0.0 {
        return 0.0;
    }
    distance_km / average_speed_kmh * 60.0
}
