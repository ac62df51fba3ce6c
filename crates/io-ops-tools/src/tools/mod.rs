//! Allowlisted tool implementations.

pub mod calculate;
pub mod retrieve_info;
pub mod tickets;

pub use calculate::Calculate;
pub use retrieve_info::RetrieveIncidentInfo;
pub use tickets::{CreateTicket, GetTicketStatus, UpdateTicketStatus};

use crate::types::OpsTool;

/// Every tool, in allowlist order.
pub fn all_tools() -> Vec<Box<dyn OpsTool>> {
    vec![
        Box::new(RetrieveIncidentInfo),
        Box::new(Calculate),
        Box::new(CreateTicket),
        Box::new(GetTicketStatus),
        Box::new(UpdateTicketStatus),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use io_protocol::Operation;

    #[test]
    fn one_tool_per_operation() {
        let tools = all_tools();
        let ops: Vec<Operation> = tools.iter().map(|t| t.operation()).collect();
        assert_eq!(ops, Operation::ALL.to_vec());
        for tool in &tools {
            assert_eq!(tool.name(), tool.operation().as_str());
            assert_eq!(tool.parameters_schema()["type"], "object");
        }
    }
}
