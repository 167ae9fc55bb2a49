use std::collections::BTreeMap;
use std::net::SocketAddr;

struct RegisteredCar {
    addr: SocketAddr,
    in_service: bool,
}

/// Maps car ids to their controller endpoints. Iteration is in id order,
/// which fixes the tie-break of the selection algorithm.
#[derive(Default)]
pub struct Registry {
    cars: BTreeMap<u8, RegisteredCar>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { cars: BTreeMap::new() }
    }

    /// Registering again replaces the endpoint and puts the car back in
    /// service, as a restarted car process would.
    pub fn register(&mut self, elevator_id: u8, addr: SocketAddr) {
        self.cars.insert(elevator_id, RegisteredCar { addr, in_service: true });
    }

    pub fn addr(&self, elevator_id: u8) -> Option<SocketAddr> {
        self.cars.get(&elevator_id).map(|car| car.addr)
    }

    /// Withdraws a car from selection. Its controller stays reachable.
    pub fn retire(&mut self, elevator_id: u8) -> bool {
        match self.cars.get_mut(&elevator_id) {
            Some(car) => {
                car.in_service = false;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_in_service(&self, elevator_id: u8) -> bool {
        self.cars.get(&elevator_id).map_or(false, |car| car.in_service)
    }

    pub fn in_service(&self) -> Vec<(u8, SocketAddr)> {
        self.cars
            .iter()
            .filter(|(_, car)| car.in_service)
            .map(|(id, car)| (*id, car.addr))
            .collect()
    }
}
