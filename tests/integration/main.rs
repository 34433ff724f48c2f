mod copy_test;
mod ledger_test;
